/// Proper-name generation behind the reserved `#{__name__}` reference.
///
/// The default generator is a character-level Markov chain trained on a
/// list of sample names.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

/// Reference name that asks for a proper name instead of a tag lookup.
pub const NAME_REFERENCE: &str = "__name__";

/// Sample names bundled with the crate.
pub const DEFAULT_NAMES: &str = include_str!("../../catalog_data/names.txt");

/// Boundary marker at both ends of a name.
const BOUNDARY: char = '^';

/// Anything able to invent a proper name.
pub trait NameGenerator: Send + Sync {
    /// `None` when no name can be produced.
    fn generate(&self, rng: &mut StdRng) -> Option<String>;
}

/// Character n-gram model: prefix of `n - 1` characters → weighted next characters.
#[derive(Debug, Clone, Default)]
pub struct MarkovNames {
    n: usize,
    min_len: usize,
    max_len: usize,
    transitions: FxHashMap<Vec<char>, Vec<(char, u32)>>,
}

impl MarkovNames {
    /// Train on one name per line; blank lines and `#` comments are skipped.
    pub fn train(names: &str, n: usize) -> Self {
        assert!((2..=4).contains(&n), "n-gram depth must be 2-4");

        let mut transitions: FxHashMap<Vec<char>, Vec<(char, u32)>> = FxHashMap::default();
        let mut min_len = usize::MAX;
        let mut max_len = 0;

        for line in names.lines() {
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            let letters: Vec<char> = name.to_lowercase().chars().collect();
            min_len = min_len.min(letters.len());
            max_len = max_len.max(letters.len());

            let mut padded = vec![BOUNDARY; n - 1];
            padded.extend(letters);
            padded.push(BOUNDARY);

            for window in padded.windows(n) {
                let entries = transitions.entry(window[..n - 1].to_vec()).or_default();
                let next = window[n - 1];
                match entries.iter_mut().find(|(c, _)| *c == next) {
                    Some(entry) => entry.1 += 1,
                    None => entries.push((next, 1)),
                }
            }
        }

        if transitions.is_empty() {
            return Self::default();
        }

        Self {
            n,
            min_len: min_len.max(2),
            max_len: max_len.max(min_len),
            transitions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    fn walk(&self, rng: &mut StdRng) -> Option<String> {
        let mut state = vec![BOUNDARY; self.n - 1];
        let mut name = String::new();
        let mut len = 0;

        loop {
            let options = self.transitions.get(&state)?;
            let weights: Vec<u32> = options.iter().map(|(_, count)| *count).collect();
            let dist = WeightedIndex::new(&weights).ok()?;
            let next = options[dist.sample(rng)].0;

            if next == BOUNDARY {
                break;
            }
            name.push(next);
            len += 1;
            if len > self.max_len {
                return None;
            }

            state.remove(0);
            state.push(next);
        }

        (len >= self.min_len).then(|| capitalize(&name))
    }
}

impl NameGenerator for MarkovNames {
    fn generate(&self, rng: &mut StdRng) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        // Walks that end too short or too long are redrawn a few times.
        (0..32).find_map(|_| self.walk(rng))
    }
}

/// Uppercase the first letter of each space- or hyphen-separated part.
fn capitalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut start = true;
    for c in name.chars() {
        if start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        start = c == ' ' || c == '-';
    }
    out
}
