//! The three redundant talk-page banners and how their dated entries are
//! read out of a transclusion.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::MergeError;
use crate::scan::{self, Transclusion};

static DATE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^date\d*$").expect("date key pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Itn,
    Otd,
    Dyk,
}

impl BannerKind {
    /// Processing and serialization order.
    pub const ALL: [Self; 3] = [Self::Itn, Self::Otd, Self::Dyk];

    /// Parameter-name prefix inside `{{article history}}`: `itndate`,
    /// `itn2date`, `itn2link`, ...
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Itn => "itn",
            Self::Otd => "otd",
            Self::Dyk => "dyk",
        }
    }

    /// Normalized transclusion names the banner goes by.
    pub fn template_names(self) -> &'static [&'static str] {
        match self {
            Self::Itn => &["itn talk"],
            Self::Otd => &["on this day"],
            Self::Dyk => &["dyk talk", "dyktalk"],
        }
    }

    /// Per-entry parameter suffixes beyond `date`.
    pub fn extra_suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Itn => &["link"],
            Self::Otd => &["oldid", "link"],
            Self::Dyk => &["entry"],
        }
    }
}

/// A dated entry lifted out of one banner transclusion. Transient: built,
/// sorted and written back within a single merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerEntry {
    pub date: String,
    /// Aligned with the kind's [`BannerKind::extra_suffixes`].
    pub extras: Vec<String>,
}

pub fn extract_entries(
    kind: BannerKind,
    banner: &Transclusion,
) -> Result<Vec<BannerEntry>, MergeError> {
    match kind {
        BannerKind::Itn => Ok(extract_itn_entries(banner)),
        BannerKind::Otd => Ok(extract_otd_entries(banner)),
        BannerKind::Dyk => extract_dyk_entry(banner).map(|entry| vec![entry]),
    }
}

/// `{{ITN talk}}` carries `date`/`date1`/`date2`/... named parameters;
/// nothing else on the banner survives the merge.
fn extract_itn_entries(banner: &Transclusion) -> Vec<BannerEntry> {
    banner
        .params
        .iter()
        .filter_map(|param| {
            let name = param.name.as_deref()?;
            if !DATE_KEY.is_match(name) {
                return None;
            }
            Some(BannerEntry {
                date: param.value.trim().to_string(),
                extras: vec![String::new()],
            })
        })
        .collect()
}

/// `{{On this day}}` pairs `dateN` with `oldidN`, numbered from 1.
fn extract_otd_entries(banner: &Transclusion) -> Vec<BannerEntry> {
    let mut entries = Vec::new();
    for index in 1.. {
        let date = match banner.named(&format!("date{index}")) {
            Some(value) => value,
            None if index == 1 => match banner.named("date") {
                Some(value) => value,
                None => break,
            },
            None => break,
        };
        let oldid = banner
            .named(&format!("oldid{index}"))
            .or_else(|| if index == 1 { banner.named("oldid") } else { None })
            .unwrap_or("");
        entries.push(BannerEntry {
            date: date.to_string(),
            extras: vec![oldid.to_string(), String::new()],
        });
    }
    entries
}

/// `{{dyk talk}}` holds a single hook: a required `entry=` plus either one
/// positional date token or a day-month/year token pair in either order.
fn extract_dyk_entry(banner: &Transclusion) -> Result<BannerEntry, MergeError> {
    let hook = banner.named_raw("entry").ok_or(MergeError::MissingDykEntry)?;
    if hook.trim().is_empty() {
        return Err(MergeError::MissingDykEntry);
    }

    let positional = banner.positional();
    let date = match positional.as_slice() {
        [date] => (*date).to_string(),
        [first, second] => {
            // The year is the 4-character token.
            match (first.len() == 4, second.len() == 4) {
                (false, true) => format!("{first} {second}"),
                (true, false) => format!("{second} {first}"),
                _ => {
                    return Err(MergeError::UnparseableDate {
                        kind: BannerKind::Dyk.prefix(),
                        value: positional.join("|"),
                    });
                }
            }
        }
        _ => return Err(MergeError::MissingDykDate),
    };

    Ok(BannerEntry {
        date,
        extras: vec![hook.to_string()],
    })
}

/// Text above the first section heading; the banners this bot consumes live
/// in the lead.
pub fn lead_section(page: &str) -> &str {
    match page.find("==") {
        Some(index) => &page[..index],
        None => page,
    }
}

/// Whether the lead still carries any of the redundant banners.
pub fn has_redundant_banner(page: &str) -> bool {
    let lead = lead_section(page);
    BannerKind::ALL
        .iter()
        .any(|kind| scan::find_first(lead, kind.template_names()).is_some())
}

#[cfg(test)]
mod tests {
    use super::{BannerEntry, BannerKind, extract_entries, has_redundant_banner, lead_section};
    use crate::error::MergeError;
    use crate::scan;

    fn banner(kind: BannerKind, text: &str) -> Vec<BannerEntry> {
        let found = scan::find_first(text, kind.template_names()).expect("banner");
        extract_entries(kind, &found).expect("entries")
    }

    #[test]
    fn itn_entries_come_from_date_parameters_in_order() {
        let entries = banner(
            BannerKind::Itn,
            "{{ITN talk|date1=12 September 2009|date2=24 December 2013}}",
        );
        assert_eq!(
            entries,
            vec![
                BannerEntry {
                    date: "12 September 2009".to_string(),
                    extras: vec![String::new()],
                },
                BannerEntry {
                    date: "24 December 2013".to_string(),
                    extras: vec![String::new()],
                },
            ]
        );
    }

    #[test]
    fn itn_accepts_the_unnumbered_date_parameter() {
        let entries = banner(BannerKind::Itn, "{{ITN talk|date=1 June 2009|alt=yes}}");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, "1 June 2009");
    }

    #[test]
    fn otd_pairs_dates_with_oldids() {
        let entries = banner(
            BannerKind::Otd,
            "{{On this day|date1=2004-05-28|oldid1=6717950|date2=2005-05-28|oldid2=16335227}}",
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "2004-05-28");
        assert_eq!(entries[0].extras, vec!["6717950".to_string(), String::new()]);
        assert_eq!(entries[1].date, "2005-05-28");
        assert_eq!(
            entries[1].extras,
            vec!["16335227".to_string(), String::new()]
        );
    }

    #[test]
    fn otd_stops_at_the_first_missing_date() {
        let entries = banner(
            BannerKind::Otd,
            "{{On this day|date1=2004-05-28|date3=2006-05-28}}",
        );
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn dyk_combines_day_month_and_year_in_either_order() {
        let forward = banner(BannerKind::Dyk, "{{dyktalk|6 April|2015|entry=hook}}");
        let reversed = banner(BannerKind::Dyk, "{{dyktalk|2015|6 April|entry=hook}}");
        assert_eq!(forward[0].date, "6 April 2015");
        assert_eq!(reversed[0].date, "6 April 2015");
    }

    #[test]
    fn dyk_keeps_the_raw_entry_hook() {
        let entries = banner(
            BannerKind::Dyk,
            "{{dyktalk|6 April|2015|entry= ... that something happened?}}",
        );
        assert_eq!(entries[0].extras, vec![" ... that something happened?".to_string()]);
    }

    #[test]
    fn dyk_without_entry_is_an_error() {
        let found = scan::find_first("{{dyktalk|6 April|2015}}", BannerKind::Dyk.template_names())
            .expect("banner");
        assert_eq!(
            extract_entries(BannerKind::Dyk, &found),
            Err(MergeError::MissingDykEntry)
        );
    }

    #[test]
    fn dyk_without_date_tokens_is_an_error() {
        let found = scan::find_first("{{dyktalk|entry=hook}}", BannerKind::Dyk.template_names())
            .expect("banner");
        assert_eq!(
            extract_entries(BannerKind::Dyk, &found),
            Err(MergeError::MissingDykDate)
        );
    }

    #[test]
    fn dyk_with_two_ambiguous_tokens_is_an_error() {
        let found = scan::find_first(
            "{{dyktalk|6 April|7 April|entry=hook}}",
            BannerKind::Dyk.template_names(),
        )
        .expect("banner");
        assert!(matches!(
            extract_entries(BannerKind::Dyk, &found),
            Err(MergeError::UnparseableDate { kind: "dyk", .. })
        ));
    }

    #[test]
    fn lead_section_stops_at_the_first_heading() {
        let page = "{{ITN talk|date1=1 June 2009}}\n==History==\n{{dyktalk|6 April|2015|entry=x}}";
        assert_eq!(lead_section(page), "{{ITN talk|date1=1 June 2009}}\n");
        assert!(has_redundant_banner(page));
        assert!(!has_redundant_banner("==History==\n{{ITN talk|date1=1 June 2009}}"));
    }
}
