//! Fortune cookies for the utilities menu.
//!
//! Stateless; every entry fits in one mesh frame.

use rand::Rng;

const FORTUNES: [&str; 40] = [
    "The only true wisdom is in knowing you know nothing. - Socrates",
    "In the middle of difficulty lies opportunity. - Albert Einstein",
    "The journey of a thousand miles begins with one step. - Lao Tzu",
    "Be yourself; everyone else is already taken. - Oscar Wilde",
    "Life is what happens when you're busy making other plans. - John Lennon",
    "Well begun is half done. - Aristotle",
    "What we think, we become. - Buddha",
    "Fortune favors the bold. - Virgil",
    "Knowledge speaks, but wisdom listens. - Jimi Hendrix",
    "Simplicity is the ultimate sophistication. - Leonardo da Vinci",
    "There are only two hard things in Computer Science: cache invalidation and naming things.",
    "First, solve the problem. Then, write the code. - John Johnson",
    "Code is like humor. When you have to explain it, it's bad. - Cory House",
    "Premature optimization is the root of all evil. - Donald Knuth",
    "Talk is cheap. Show me the code. - Linus Torvalds",
    "It works on my machine.",
    "Weeks of coding can save you hours of planning.",
    "Any sufficiently advanced technology is indistinguishable from magic. - Arthur C. Clarke",
    "The best way to predict the future is to invent it. - Alan Kay",
    "Programs must be written for people to read. - Harold Abelson",
    "73 de mesh: the band is open somewhere.",
    "A relay a day keeps the dead zone away.",
    "Your signal is weak but your spirit is strong.",
    "Line of sight is a state of mind.",
    "Every hop is a small act of trust.",
    "Store, forward, repeat.",
    "Low bandwidth, high patience.",
    "The antenna you have is better than the antenna you meant to build.",
    "Somewhere a node is listening. Be kind.",
    "Batteries are temporary. Solar is forever-ish.",
    "You will receive a message. Eventually.",
    "A watched inbox never fills.",
    "Today is a good day to check your coax.",
    "The mesh remembers what the cloud forgets.",
    "He who posts in Urgent had better mean it.",
    "Short messages travel farthest.",
    "An ounce of elevation is worth a pound of power.",
    "Silence on the air is not silence in the mesh.",
    "When in doubt, reboot the repeater.",
    "Keep calm and carry spare batteries.",
];

/// Pick a fortune uniformly at random.
pub fn get_fortune() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..FORTUNES.len());
    FORTUNES[idx]
}
