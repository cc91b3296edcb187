//! Folding redundant banners into `{{article history}}`.
//!
//! The engine is a pure string-to-string function: one talk page's wikitext
//! in, the rewritten page out. It holds no state between calls and performs
//! no I/O, so a batch driver may call it from anywhere, concurrently, and
//! discard the result on error without having mutated anything.

use crate::banner::{self, BannerEntry, BannerKind};
use crate::error::MergeError;
use crate::record::{ArticleHistory, TEMPLATE_NAMES};
use crate::scan;
use crate::timestamp::parse_timestamp;

/// Placeholder left where a consumed banner stood until line cleanup runs,
/// so already-consumed text is never rematched.
const DELETE_MARK: &str = "<!-- Delete this line. -->";

/// Merges every redundant banner on a talk page into its `{{article
/// history}}` template and strips the consumed banners. A page without an
/// article history template passes through unchanged.
pub fn merge_page(wikitext: &str) -> Result<String, MergeError> {
    let Some(history_block) = scan::find_first(wikitext, TEMPLATE_NAMES) else {
        return Ok(wikitext.to_string());
    };
    let original_block = history_block.text(wikitext).to_string();
    let mut history = ArticleHistory::from_transclusion(&history_block);

    let mut text = wikitext.to_string();
    for kind in BannerKind::ALL {
        text = consume_banners(&mut history, kind, text, &original_block)?;
    }

    let text = strip_delete_marks(&text);
    Ok(text.replacen(&original_block, &history.to_wikitext(), 1))
}

fn consume_banners(
    history: &mut ArticleHistory,
    kind: BannerKind,
    mut text: String,
    history_block: &str,
) -> Result<String, MergeError> {
    // The history block must survive verbatim until the final rewrite; a
    // banner nested inside it is left alone.
    let protected = text
        .find(history_block)
        .map(|start| start..start + history_block.len());
    let banners: Vec<_> = scan::find_all(&text, kind.template_names())
        .into_iter()
        .filter(|found| match &protected {
            Some(range) => found.end <= range.start || found.start >= range.end,
            None => true,
        })
        .collect();
    if banners.is_empty() {
        return Ok(text);
    }
    if kind == BannerKind::Dyk && banners.len() > 1 {
        return Err(MergeError::MultipleDykBanners);
    }

    let mut entries = Vec::new();
    for found in &banners {
        entries.extend(banner::extract_entries(kind, found)?);
    }
    let seeds = take_family_entries(history, kind);

    match kind {
        BannerKind::Dyk => {
            // A dyk banner is never numbered; its single hook replaces
            // whatever the template already recorded.
            parse_timestamp(kind.prefix(), &entries[0].date)?;
        }
        BannerKind::Itn | BannerKind::Otd => {
            entries.extend(seeds);
            if entries.is_empty() {
                return Err(MergeError::EmptyBanner {
                    kind: kind.prefix(),
                });
            }
            entries = sort_by_date(kind, entries)?;
        }
    }
    write_family_entries(history, kind, &entries);

    for found in banners.iter().rev() {
        text.replace_range(found.start..found.end, DELETE_MARK);
    }
    Ok(text)
}

/// Drains the contiguous run of a family's entries already recorded in the
/// template (`itndate`/`itnlink`, `itn2date`/..., numbered from 2) so the
/// write-back can re-number without leaving stale suffix keys behind.
fn take_family_entries(history: &mut ArticleHistory, kind: BannerKind) -> Vec<BannerEntry> {
    let prefix = kind.prefix();
    let mut entries = Vec::new();
    for index in 1.. {
        let stem = if index == 1 {
            prefix.to_string()
        } else {
            format!("{prefix}{index}")
        };
        let Some(date) = history.other_parameters.remove(&format!("{stem}date")) else {
            break;
        };
        let extras = kind
            .extra_suffixes()
            .iter()
            .map(|suffix| {
                history
                    .other_parameters
                    .remove(&format!("{stem}{suffix}"))
                    .unwrap_or_default()
            })
            .collect();
        entries.push(BannerEntry { date, extras });
    }
    entries
}

/// First entry takes the unnumbered keys, the rest number from 2. Empty
/// suffix values are omitted entirely.
fn write_family_entries(history: &mut ArticleHistory, kind: BannerKind, entries: &[BannerEntry]) {
    let prefix = kind.prefix();
    for (index, entry) in entries.iter().enumerate() {
        let stem = if index == 0 {
            prefix.to_string()
        } else {
            format!("{prefix}{}", index + 1)
        };
        history
            .other_parameters
            .insert(format!("{stem}date"), entry.date.clone());
        for (suffix, value) in kind.extra_suffixes().iter().zip(&entry.extras) {
            if !value.is_empty() {
                history
                    .other_parameters
                    .insert(format!("{stem}{suffix}"), value.clone());
            }
        }
    }
}

/// Chronological, ascending; the sort is stable so same-day entries keep
/// their banner-before-seed order.
fn sort_by_date(kind: BannerKind, entries: Vec<BannerEntry>) -> Result<Vec<BannerEntry>, MergeError> {
    let mut keyed = Vec::with_capacity(entries.len());
    for entry in entries {
        let parsed = parse_timestamp(kind.prefix(), &entry.date)?;
        keyed.push((parsed, entry));
    }
    keyed.sort_by_key(|(parsed, _)| *parsed);
    Ok(keyed.into_iter().map(|(_, entry)| entry).collect())
}

fn strip_delete_marks(text: &str) -> String {
    let had_trailing_newline = text.ends_with('\n');
    let mut cleaned = text
        .lines()
        .filter(|line| line.trim() != DELETE_MARK)
        .collect::<Vec<_>>()
        .join("\n");
    if had_trailing_newline && !cleaned.is_empty() {
        cleaned.push('\n');
    }
    // A banner that shared its line with other text leaves the mark inline.
    if cleaned.contains(DELETE_MARK) {
        cleaned = cleaned.replace(DELETE_MARK, "");
    }
    cleaned
}
