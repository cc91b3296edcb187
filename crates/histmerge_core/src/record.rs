//! The `{{article history}}` record model: an ordered run of review actions
//! plus the open-ended map of everything else the template carries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::banner::BannerKind;
use crate::error::ParseError;
use crate::scan::{self, Transclusion};

pub const TEMPLATE_NAMES: &[&str] = &["article history"];

static ACTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^action\d+").expect("action key pattern"));

const TRAILING_PARAMETERS: [&str; 10] = [
    "four", "aciddate", "ftname", "ftmain", "ft2name", "ft2main", "ft3name", "ft3main", "topic",
    "small",
];

/// One row of the article's review history. Immutable once parsed; actions
/// are never merged or reordered, only re-numbered positionally on output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub kind: String,
    pub date: String,
    pub link: String,
    pub result: String,
    pub oldid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleHistory {
    pub actions: Vec<Action>,
    /// Every non-action parameter, verbatim. Never contains a key matching
    /// the `action<N>` prefix; those live in `actions`.
    pub other_parameters: BTreeMap<String, String>,
}

impl ArticleHistory {
    /// Builds a record from the first `{{article history}}` transclusion in
    /// `wikitext`. Parameter segments without `=` are skipped.
    pub fn parse(wikitext: &str) -> Result<Self, ParseError> {
        let transclusion =
            scan::find_first(wikitext, TEMPLATE_NAMES).ok_or(ParseError::TemplateNotFound)?;
        Ok(Self::from_transclusion(&transclusion))
    }

    /// Like [`ArticleHistory::parse`], but a parameter segment without `=`
    /// is an error instead of being skipped.
    pub fn parse_strict(wikitext: &str) -> Result<Self, ParseError> {
        let transclusion =
            scan::find_first(wikitext, TEMPLATE_NAMES).ok_or(ParseError::TemplateNotFound)?;
        if let Some(param) = transclusion.params.iter().find(|param| param.name.is_none()) {
            return Err(ParseError::MalformedSegment {
                segment: param.value.trim().to_string(),
            });
        }
        Ok(Self::from_transclusion(&transclusion))
    }

    pub fn from_transclusion(transclusion: &Transclusion) -> Self {
        let mut params = BTreeMap::new();
        for param in &transclusion.params {
            if let Some(name) = &param.name {
                params.insert(name.clone(), param.value.trim().to_string());
            }
        }

        let mut actions = Vec::new();
        loop {
            let prefix = format!("action{}", actions.len() + 1);
            let Some(kind) = params.remove(&prefix) else {
                break;
            };
            actions.push(Action {
                kind,
                date: params.remove(&format!("{prefix}date")).unwrap_or_default(),
                link: params.remove(&format!("{prefix}link")).unwrap_or_default(),
                result: params
                    .remove(&format!("{prefix}result"))
                    .unwrap_or_default(),
                oldid: params.remove(&format!("{prefix}oldid")).unwrap_or_default(),
            });
        }

        // Action keys past the contiguous run (action5 with action4 missing)
        // are dropped rather than kept as plain parameters.
        params.retain(|key, _| !ACTION_KEY.is_match(key));

        ArticleHistory {
            actions,
            other_parameters: params,
        }
    }

    /// Canonical serialization. Families come out in a fixed order, one
    /// parameter per line, absent parameters omitted; re-serializing an
    /// unchanged record is a fixed point.
    pub fn to_wikitext(&self) -> String {
        let mut output = String::from("{{article history");

        for (index, action) in self.actions.iter().enumerate() {
            let number = index + 1;
            output.push_str(&format!("\n|action{number}={}", action.kind));
            output.push_str(&format!("\n|action{number}date={}", action.date));
            output.push_str(&format!("\n|action{number}link={}", action.link));
            output.push_str(&format!("\n|action{number}result={}", action.result));
            output.push_str(&format!("\n|action{number}oldid={}", action.oldid));
            output.push('\n');
        }

        let mut emitted = BTreeSet::new();
        for key in ["currentstatus", "maindate"] {
            self.append_parameter(&mut output, &mut emitted, key.to_string());
        }

        for kind in BannerKind::ALL {
            let prefix = kind.prefix();
            self.append_parameter(&mut output, &mut emitted, format!("{prefix}date"));
            for suffix in kind.extra_suffixes() {
                self.append_parameter(&mut output, &mut emitted, format!("{prefix}{suffix}"));
            }
            if self
                .other_parameters
                .contains_key(&format!("{prefix}2date"))
            {
                let mut last = 2;
                while self
                    .other_parameters
                    .contains_key(&format!("{prefix}{}date", last + 1))
                {
                    last += 1;
                }
                for number in 2..=last {
                    self.append_parameter(&mut output, &mut emitted, format!("{prefix}{number}date"));
                    for suffix in kind.extra_suffixes() {
                        self.append_parameter(
                            &mut output,
                            &mut emitted,
                            format!("{prefix}{number}{suffix}"),
                        );
                    }
                }
            }
        }

        for key in TRAILING_PARAMETERS {
            self.append_parameter(&mut output, &mut emitted, key.to_string());
        }

        // Parameters the canonical ordering does not know about still round-trip.
        let leftovers: Vec<String> = self
            .other_parameters
            .keys()
            .filter(|key| !emitted.contains(*key))
            .cloned()
            .collect();
        for key in leftovers {
            self.append_parameter(&mut output, &mut emitted, key);
        }

        output.push_str("\n}}");
        output
    }

    fn append_parameter(&self, output: &mut String, emitted: &mut BTreeSet<String>, key: String) {
        if let Some(value) = self.other_parameters.get(&key) {
            output.push_str(&format!("\n|{key}={value}"));
            emitted.insert(key);
        }
    }
}
