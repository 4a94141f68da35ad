//! Recency filter selection.
//!
//! A fetch needs exactly one [`RecencyFilter`] before it starts. It comes
//! either from the command line ([`PresetSelector`]) or from an interactive
//! prompt ([`PromptSelector`]). Selection is a blocking call; the async
//! pipeline only starts once it has returned.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use crate::models::{RecencyFilter, RECENCY_FILTERS};

pub trait FilterSelector {
    /// Pick a filter. `Ok(None)` means the user cancelled.
    fn select(&self) -> Result<Option<RecencyFilter>>;
}

/// Always yields the same filter.
pub struct PresetSelector(pub RecencyFilter);

impl FilterSelector for PresetSelector {
    fn select(&self) -> Result<Option<RecencyFilter>> {
        Ok(Some(self.0))
    }
}

/// Lists the presets on `output` and reads the answer from `input`.
///
/// An answer may be the option number, the preset id, or a fragment of the
/// label that matches exactly one option. Unrecognized answers are asked
/// again; an empty line or end of input cancels.
pub struct PromptSelector<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

impl PromptSelector<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> FilterSelector for PromptSelector<R, W> {
    fn select(&self) -> Result<Option<RecencyFilter>> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| anyhow::anyhow!("filter prompt poisoned"))?;
        let (input, output) = &mut *guard;

        for (i, filter) in RECENCY_FILTERS.iter().enumerate() {
            writeln!(output, "{}. {}", i + 1, filter.label)?;
        }

        loop {
            write!(output, "Fetch which notes? [1-{}]: ", RECENCY_FILTERS.len())?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match match_answer(answer) {
                Some(filter) => return Ok(Some(filter)),
                None => writeln!(output, "No filter matches '{}'.", answer)?,
            }
        }
    }
}

/// Resolve a prompt answer to a preset.
pub fn match_answer(answer: &str) -> Option<RecencyFilter> {
    if let Ok(n) = answer.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| RECENCY_FILTERS.get(i))
            .copied();
    }
    if let Some(filter) = RecencyFilter::by_id(answer) {
        return Some(filter);
    }

    let needle = answer.to_lowercase();
    let mut hits = RECENCY_FILTERS
        .iter()
        .filter(|f| f.label.to_lowercase().contains(&needle));
    match (hits.next(), hits.next()) {
        (Some(only), None) => Some(*only),
        _ => None,
    }
}
