use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "agile", "bold", "brave", "calm", "clever", "crisp", "eager", "fancy", "gentle", "happy",
    "jolly", "keen", "lively", "lucky", "mellow", "nimble", "proud", "quick", "quiet", "rapid",
    "shiny", "silent", "steady", "sunny", "swift", "tidy", "vivid", "witty", "young", "zesty",
];

const NOUNS: &[&str] = &[
    "badger", "beaver", "bison", "condor", "coyote", "falcon", "ferret", "gecko", "heron",
    "ibis", "jackal", "koala", "lemur", "lynx", "marten", "moose", "newt", "ocelot", "otter",
    "panda", "puffin", "quail", "raven", "salmon", "tapir", "toucan", "urchin", "walrus",
    "wombat", "yak",
];

/// `<prefix>-<adjective>-<noun>-<4 hex digits>`
pub fn random_name(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("plain");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("device");
    let suffix: u16 = rng.gen_range(0..=u16::MAX);
    format!("{prefix}-{adjective}-{noun}-{suffix:04x}")
}

/// Hands out random names, never returning the same name twice.
#[derive(Debug, Default)]
pub struct NameRegistry {
    issued: Mutex<HashSet<String>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, prefix: &str) -> String {
        let mut issued = self
            .issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            let name = random_name(prefix);
            if issued.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Reserve a caller-chosen name. Returns false if it was already issued.
    pub fn reserve(&self, name: &str) -> bool {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string())
    }

    pub fn len(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
