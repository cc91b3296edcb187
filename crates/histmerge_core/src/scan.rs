//! Locating template transclusions in page wikitext.
//!
//! Talk-page banners regularly sit inside other templates and carry
//! wikilinks in their parameter values, so matching is done with a
//! brace-depth scanner: a nested `{{cite}}` in a value does not end the
//! match early, and the `|` inside `[[target|label]]` does not split a
//! parameter.

/// One `{{...}}` occurrence, with byte offsets into the page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transclusion {
    pub start: usize,
    pub end: usize,
    /// Normalized template name: lowercased, underscores as spaces,
    /// whitespace collapsed.
    pub name: String,
    pub params: Vec<Param>,
}

/// A single `|`-separated parameter. Values are kept raw; `{{dyk talk}}`
/// entry hooks have significant leading whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    pub value: String,
}

impl Transclusion {
    /// The exact substring of `page` this transclusion was parsed from.
    pub fn text<'a>(&self, page: &'a str) -> &'a str {
        &page[self.start..self.end]
    }

    /// Raw (untrimmed) value of a named parameter.
    pub fn named_raw(&self, key: &str) -> Option<&str> {
        self.params.iter().find_map(|param| match &param.name {
            Some(name) if name == key => Some(param.value.as_str()),
            _ => None,
        })
    }

    /// Trimmed value of a named parameter.
    pub fn named(&self, key: &str) -> Option<&str> {
        self.named_raw(key).map(str::trim)
    }

    /// Trimmed positional parameter values, in order.
    pub fn positional(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|param| param.name.is_none())
            .map(|param| param.value.trim())
            .collect()
    }
}

/// First transclusion of any of `names`, by page position.
pub fn find_first(page: &str, names: &[&str]) -> Option<Transclusion> {
    find_impl(page, names, true).into_iter().next()
}

/// Every transclusion of any of `names`, in page order. Matches nested
/// inside other templates are found; the interior of a match is not
/// rescanned.
pub fn find_all(page: &str, names: &[&str]) -> Vec<Transclusion> {
    find_impl(page, names, false)
}

fn find_impl(page: &str, names: &[&str], first_only: bool) -> Vec<Transclusion> {
    let bytes = page.as_bytes();
    let mut found = Vec::new();
    let mut cursor = 0usize;
    while cursor + 1 < bytes.len() {
        if bytes[cursor] != b'{' || bytes[cursor + 1] != b'{' {
            cursor += 1;
            continue;
        }
        match parse_at(page, cursor) {
            Some(transclusion) if name_matches(&transclusion.name, names) => {
                let end = transclusion.end;
                found.push(transclusion);
                if first_only {
                    return found;
                }
                cursor = end;
            }
            _ => cursor += 2,
        }
    }
    found
}

fn parse_at(page: &str, start: usize) -> Option<Transclusion> {
    let end = matching_close(page, start)?;
    let body = &page[start + 2..end - 2];
    let mut segments = split_top_level(body).into_iter();
    let name = normalize_name(segments.next()?);
    let params = segments.map(parse_param).collect();
    Some(Transclusion {
        start,
        end,
        name,
        params,
    })
}

/// Byte offset one past the `}}` closing the `{{` at `start`, honoring
/// nested double braces.
fn matching_close(page: &str, start: usize) -> Option<usize> {
    let bytes = page.as_bytes();
    let mut depth = 0usize;
    let mut index = start;
    while index < bytes.len() {
        if index + 1 < bytes.len() && bytes[index] == b'{' && bytes[index + 1] == b'{' {
            depth += 1;
            index += 2;
        } else if index + 1 < bytes.len() && bytes[index] == b'}' && bytes[index + 1] == b'}' {
            depth -= 1;
            index += 2;
            if depth == 0 {
                return Some(index);
            }
        } else {
            index += 1;
        }
    }
    None
}

/// Splits a template body on `|` at brace and wikilink depth zero.
fn split_top_level(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut segments = Vec::new();
    let mut brace_depth = 0usize;
    let mut link_depth = 0usize;
    let mut segment_start = 0usize;
    let mut index = 0usize;
    while index < bytes.len() {
        let pair = if index + 1 < bytes.len() {
            Some((bytes[index], bytes[index + 1]))
        } else {
            None
        };
        match pair {
            Some((b'{', b'{')) => {
                brace_depth += 1;
                index += 2;
                continue;
            }
            Some((b'}', b'}')) => {
                brace_depth = brace_depth.saturating_sub(1);
                index += 2;
                continue;
            }
            Some((b'[', b'[')) => {
                link_depth += 1;
                index += 2;
                continue;
            }
            Some((b']', b']')) => {
                link_depth = link_depth.saturating_sub(1);
                index += 2;
                continue;
            }
            _ => {}
        }
        if bytes[index] == b'|' && brace_depth == 0 && link_depth == 0 {
            segments.push(&body[segment_start..index]);
            segment_start = index + 1;
        }
        index += 1;
    }
    segments.push(&body[segment_start..]);
    segments
}

fn parse_param(segment: &str) -> Param {
    match segment.split_once('=') {
        Some((name, value)) => Param {
            name: Some(name.trim().to_string()),
            value: value.to_string(),
        },
        None => Param {
            name: None,
            value: segment.to_string(),
        },
    }
}

fn normalize_name(raw: &str) -> String {
    raw.trim()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn name_matches(name: &str, names: &[&str]) -> bool {
    names.iter().any(|candidate| name == *candidate)
}

#[cfg(test)]
mod tests {
    use super::{find_all, find_first, normalize_name, split_top_level};

    #[test]
    fn finds_simple_transclusion() {
        let page = "lead text\n{{ITN talk|date1=12 September 2009}}\nmore";
        let found = find_first(page, &["itn talk"]).expect("match");
        assert_eq!(found.text(page), "{{ITN talk|date1=12 September 2009}}");
        assert_eq!(found.named("date1"), Some("12 September 2009"));
    }

    #[test]
    fn name_normalization_accepts_case_and_underscores() {
        assert_eq!(normalize_name("  Article_history\n"), "article history");
        assert_eq!(normalize_name("On  this   day"), "on this day");
        let page = "{{article_HISTORY|topic=math}}";
        assert!(find_first(page, &["article history"]).is_some());
    }

    #[test]
    fn nested_template_does_not_truncate_the_match() {
        let page = "{{article history|action1result=kept {{small|see talk}} then|topic=math}}";
        let found = find_first(page, &["article history"]).expect("match");
        assert_eq!(found.end, page.len());
        assert_eq!(
            found.named("action1result"),
            Some("kept {{small|see talk}} then")
        );
    }

    #[test]
    fn pipe_inside_wikilink_does_not_split_parameters() {
        let page = "{{dyktalk|6 April|2015|entry=... that [[a|b]] exists?}}";
        let found = find_first(page, &["dyktalk"]).expect("match");
        assert_eq!(found.named_raw("entry"), Some("... that [[a|b]] exists?"));
        assert_eq!(found.positional(), vec!["6 April", "2015"]);
    }

    #[test]
    fn finds_banner_nested_inside_a_shell_template() {
        let page = "{{WikiProject banner shell|1=\n{{ITN talk|date1=1 June 2009}}\n}}";
        let found = find_all(page, &["itn talk"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].named("date1"), Some("1 June 2009"));
    }

    #[test]
    fn finds_every_occurrence_in_page_order() {
        let page = "{{ITN talk|date1=1 June 2010}} and {{ITN talk|date1=1 June 2009}}";
        let found = find_all(page, &["itn talk"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].named("date1"), Some("1 June 2010"));
        assert_eq!(found[1].named("date1"), Some("1 June 2009"));
    }

    #[test]
    fn unclosed_braces_do_not_match() {
        assert!(find_first("{{ITN talk|date1=1 June 2009", &["itn talk"]).is_none());
    }

    #[test]
    fn split_keeps_empty_segments() {
        assert_eq!(split_top_level("a||b"), vec!["a", "", "b"]);
        assert_eq!(split_top_level(""), vec![""]);
    }
}
