use std::cmp::Ordering;
use std::io::{Read, Write};

use tracing::{debug, info};

use crate::{WordFileError, WordFileReader, WordFileWriter, WordLine};

/// Counters reported by [`merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Lines written to the output.
    pub lines: u64,
    /// Words whose definition came from the changelog.
    pub updated: u64,
}

/// Applies a sorted, update-only changelog to a sorted word stream.
///
/// Every store line is copied to `out` unless the changelog holds the same
/// word, in which case the changelog line replaces it. The changelog may not
/// introduce words: a changelog word that sorts before the current store word,
/// or that is left over once the store is exhausted, is a
/// [`WordFileError::Contract`] violation. So is a changelog that is not
/// strictly ascending.
///
/// The output may contain a prefix of the merge when an error is returned;
/// callers write to a scratch location and discard it on failure.
pub fn merge<S: Read, C: Read, W: Write>(
    store: WordFileReader<S>,
    mut changelog: WordFileReader<C>,
    out: &mut WordFileWriter<W>,
) -> Result<MergeStats, WordFileError> {
    let mut stats = MergeStats::default();
    let mut pending: Option<WordLine> = None;
    let mut changelog_done = false;
    let mut last_update: Option<String> = None;

    for entry in store.require_ascending() {
        let stored = entry?.line;

        if pending.is_none() && !changelog_done {
            pending = next_update(&mut changelog, last_update.as_deref())?;
            changelog_done = pending.is_none();
        }

        let Some(update) = pending.as_ref() else {
            out.append(&stored)?;
            stats.lines += 1;
            continue;
        };

        match stored.word.cmp(&update.word) {
            Ordering::Equal => {
                debug!(word = %update.word, "updating definition");
                out.append(update)?;
                stats.updated += 1;
                last_update = Some(update.word.clone());
                pending = None;
            }
            Ordering::Less => {
                out.append(&stored)?;
            }
            Ordering::Greater => {
                return Err(not_in_store(&update.word));
            }
        }
        stats.lines += 1;
    }

    if pending.is_none() && !changelog_done {
        pending = next_update(&mut changelog, last_update.as_deref())?;
    }
    if let Some(update) = pending {
        return Err(not_in_store(&update.word));
    }

    info!(
        lines = stats.lines,
        updated = stats.updated,
        "merged changelog"
    );
    Ok(stats)
}

fn next_update<C: Read>(
    changelog: &mut WordFileReader<C>,
    last: Option<&str>,
) -> Result<Option<WordLine>, WordFileError> {
    let Some(entry) = changelog.next_entry()? else {
        return Ok(None);
    };
    if let Some(last) = last {
        if entry.line.word.as_str() <= last {
            return Err(WordFileError::Contract(format!(
                "changelog is not sorted: {:?} follows {:?}",
                entry.line.word, last
            )));
        }
    }
    Ok(Some(entry.line))
}

fn not_in_store(word: &str) -> WordFileError {
    WordFileError::Contract(format!("changelog word {:?} not found in store", word))
}
