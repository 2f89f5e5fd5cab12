//! Collision-free output names within one batch.

use std::collections::HashSet;

/// Tracks names already handed out in a batch.
///
/// The first claim of a name returns it unchanged; later claims append an
/// incrementing suffix before the extension: `name.ext`, `name_1.ext`,
/// `name_2.ext`, and so on.
#[derive(Debug, Default)]
pub struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a name not yet claimed in this batch, and claims it.
    pub fn claim(&mut self, name: &str) -> String {
        if self.seen.insert(name.to_string()) {
            return name.to_string();
        }

        let (stem, ext) = split_extension(name);
        let mut counter = 1usize;
        loop {
            let candidate = format!("{}_{}{}", stem, counter, ext);
            if self.seen.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Splits `name` into stem and extension (with its dot). Leading dots do not
/// start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    }
}
