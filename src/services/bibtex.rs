//! BibTeX generation and management

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::Paper;

static CITE_KEY_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(@\w+\s*\{)\s*[^,]+,").unwrap());
static ENTRY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*@\w+\s*\{\s*([^,\s]+)\s*,").unwrap());
static JOURNAL_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)journal\s*=\s*[{"]?([^},"\n]+)"#).unwrap());
static DOI_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)doi\s*=\s*[{"]?([^},"\n]+)"#).unwrap());
static VOLUME_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)volume\s*=\s*[{"]?([^},"\n]+)"#).unwrap());

const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "phd", "md"];

/// Last name of an author given as "First Last" or "Last, First",
/// skipping generational suffixes like Jr. or III.
pub fn last_name(author: &str) -> String {
    let name = if author.contains(',') {
        author.split(',').next().unwrap_or(author).trim().to_string()
    } else {
        let parts: Vec<&str> = author.split_whitespace().collect();
        let mut picked = parts.last().copied().unwrap_or(author);
        for part in parts.iter().rev() {
            let lowered = part.to_lowercase();
            if !NAME_SUFFIXES.contains(&lowered.trim_end_matches('.')) {
                picked = part;
                break;
            }
        }
        picked.to_string()
    };

    // Keep word characters, spaces and hyphens (accents included)
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Generate a cite key in the format LastName:Year (e.g. McCallum:2025),
/// appending a/b/c... when the base key is already taken.
pub fn generate_cite_key(
    authors: &[String],
    year: i32,
    arxiv_id: &str,
    existing_keys: &HashSet<String>,
) -> String {
    let name = authors
        .first()
        .map(|a| last_name(a))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let base_key = format!("{}:{}", name, year);
    if !existing_keys.contains(&base_key) {
        return base_key;
    }

    for suffix in 'a'..='z' {
        let candidate = format!("{}{}", base_key, suffix);
        if !existing_keys.contains(&candidate) {
            return candidate;
        }
    }

    // Fallback: disambiguate with the arXiv ID
    format!("{}_{}", base_key, arxiv_id.replace(['.', '/'], "_"))
}

/// Format an author list for BibTeX: "{Last}, First and {Last}, First".
pub fn format_authors_bibtex(authors: &[String]) -> String {
    let mut formatted = Vec::with_capacity(authors.len());
    for author in authors {
        let author = author.trim();
        if author.contains(',') {
            // Already in "Last, First" format
            formatted.push(format!("{{{}}}", author));
        } else {
            let parts: Vec<&str> = author.split_whitespace().collect();
            if parts.len() >= 2 {
                let last = parts[parts.len() - 1];
                let first = parts[..parts.len() - 1].join(" ");
                formatted.push(format!("{{{}}}, {}", last, first));
            } else {
                formatted.push(format!("{{{}}}", author));
            }
        }
    }
    formatted.join(" and ")
}

/// Escape BibTeX-sensitive characters, leaving already-escaped ones alone.
pub fn escape_bibtex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_backslash = false;
    for c in text.chars() {
        match c {
            '&' | '%' | '_' | '#' if !prev_backslash => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        prev_backslash = c == '\\';
    }
    out
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Generate an ADS-style BibTeX entry from arXiv preprint metadata.
pub fn generate_arxiv_bibtex(paper: &Paper, cite_key: &str) -> String {
    let authors = format_authors_bibtex(&paper.authors);
    let title = escape_bibtex(&paper.title);
    let year = paper.published.year();
    let month = MONTHS[paper.published.month0() as usize];
    let primary_class = paper
        .categories
        .first()
        .map(String::as_str)
        .unwrap_or("astro-ph");

    format!(
        r#"@ARTICLE{{{cite_key},
       author = {{{authors}}},
        title = "{{{title}}}",
         year = {year},
        month = {month},
       eprint = {{{eprint}}},
archivePrefix = {{arXiv}},
 primaryClass = {{{primary_class}}},
       adsurl = {{https://ui.adsabs.harvard.edu/abs/arXiv:{eprint}}}
}}"#,
        cite_key = cite_key,
        authors = authors,
        title = title,
        year = year,
        month = month,
        eprint = paper.arxiv_id,
        primary_class = primary_class,
    )
}

/// Replace the cite key of a BibTeX entry.
pub fn update_cite_key(bibtex: &str, new_key: &str) -> String {
    CITE_KEY_HEAD
        .replace(bibtex, |caps: &regex::Captures| {
            format!("{}{},", &caps[1], new_key)
        })
        .into_owned()
}

/// Publication indicators sniffed out of a BibTeX entry.
#[derive(Debug, Default, PartialEq)]
pub struct PublicationStatus {
    pub published: bool,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub volume: Option<String>,
}

/// Inspect a BibTeX entry for signs of journal publication.
pub fn publication_status(bibtex: &str) -> PublicationStatus {
    let mut status = PublicationStatus::default();

    if let Some(caps) = JOURNAL_FIELD.captures(bibtex) {
        let journal = caps[1].trim().to_string();
        if !journal.to_lowercase().contains("arxiv") {
            status.journal = Some(journal);
            status.published = true;
        }
    }

    if let Some(caps) = DOI_FIELD.captures(bibtex) {
        status.doi = Some(caps[1].trim().to_string());
        status.published = true;
    }

    if let Some(caps) = VOLUME_FIELD.captures(bibtex) {
        status.volume = Some(caps[1].trim().to_string());
    }

    status
}

/// Split a combined ADS BibTeX export into entries keyed by bibcode.
///
/// ADS uses the bibcode as the cite key, so entries are matched by parsing
/// each entry's key. The raw entry text is preserved as ADS produced it.
pub fn split_ads_export(export: &str, bibcodes: &[String]) -> HashMap<String, String> {
    let mut results = HashMap::new();

    for raw in split_entries(export) {
        let Some(key) = entry_key(&raw) else {
            continue;
        };
        if let Some(bibcode) = bibcodes.iter().find(|bc| **bc == key) {
            results.insert(bibcode.clone(), raw);
        }
    }

    results
}

/// Split a multi-entry BibTeX string into individual entries.
fn split_entries(bibtex: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in bibtex.lines() {
        if line.trim_start().starts_with('@') && !current.is_empty() {
            entries.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        entries.push(current.join("\n"));
    }

    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| e.starts_with('@'))
        .collect()
}

/// Cite key of a single BibTeX entry. biblatex handles the general case;
/// bibcodes with characters it rejects fall back to a regex scan.
fn entry_key(entry: &str) -> Option<String> {
    if let Ok(bibliography) = biblatex::Bibliography::parse(entry) {
        if let Some(parsed) = bibliography.iter().next() {
            return Some(parsed.key.clone());
        }
    }
    ENTRY_KEY.captures(entry).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn paper_with_authors(authors: &[&str]) -> Paper {
        let mut paper = Paper::new("2301.07041".to_string(), "Halo Assembly & Bias".to_string());
        paper.authors = authors.iter().map(|a| a.to_string()).collect();
        paper.categories = vec!["astro-ph.CO".to_string()];
        paper.published = Utc.with_ymd_and_hms(2023, 1, 17, 0, 0, 0).unwrap();
        paper
    }

    #[test]
    fn test_last_name() {
        assert_eq!(last_name("Jane McCallum"), "McCallum");
        assert_eq!(last_name("McCallum, Jane"), "McCallum");
        assert_eq!(last_name("John Smith Jr."), "Smith");
        assert_eq!(last_name("Robert Oppenheimer III"), "Oppenheimer");
        assert_eq!(last_name("van der Berg"), "Berg");
    }

    #[test]
    fn test_generate_cite_key() {
        let existing = HashSet::new();
        let key = generate_cite_key(
            &["Jane McCallum".to_string()],
            2023,
            "2301.07041",
            &existing,
        );
        assert_eq!(key, "McCallum:2023");
    }

    #[test]
    fn test_cite_key_collision_suffixes() {
        let mut existing = HashSet::new();
        existing.insert("McCallum:2023".to_string());
        existing.insert("McCallum:2023a".to_string());

        let key = generate_cite_key(
            &["Jane McCallum".to_string()],
            2023,
            "2301.07041",
            &existing,
        );
        assert_eq!(key, "McCallum:2023b");
    }

    #[test]
    fn test_cite_key_no_authors() {
        let key = generate_cite_key(&[], 2023, "2301.07041", &HashSet::new());
        assert_eq!(key, "Unknown:2023");
    }

    #[test]
    fn test_format_authors() {
        let authors = vec!["Jane McCallum".to_string(), "Iyer, Ravi".to_string()];
        assert_eq!(
            format_authors_bibtex(&authors),
            "{McCallum}, Jane and {Iyer, Ravi}"
        );
    }

    #[test]
    fn test_escape_bibtex() {
        assert_eq!(escape_bibtex("AT&T at 5% flux"), r"AT\&T at 5\% flux");
        // Already escaped characters are left alone
        assert_eq!(escape_bibtex(r"5\% flux"), r"5\% flux");
    }

    #[test]
    fn test_generate_arxiv_bibtex() {
        let paper = paper_with_authors(&["Jane McCallum"]);
        let bibtex = generate_arxiv_bibtex(&paper, "McCallum:2023");

        assert!(bibtex.starts_with("@ARTICLE{McCallum:2023,"));
        assert!(bibtex.contains("author = {{McCallum}, Jane}"));
        assert!(bibtex.contains(r"Halo Assembly \& Bias"));
        assert!(bibtex.contains("year = 2023"));
        assert!(bibtex.contains("month = jan"));
        assert!(bibtex.contains("eprint = {2301.07041}"));
        assert!(bibtex.contains("primaryClass = {astro-ph.CO}"));
    }

    #[test]
    fn test_generated_bibtex_parses() {
        let paper = paper_with_authors(&["Jane McCallum", "Ravi Iyer"]);
        let bibtex = generate_arxiv_bibtex(&paper, "McCallum:2023");

        let bibliography = biblatex::Bibliography::parse(&bibtex).unwrap();
        let entry = bibliography.iter().next().unwrap();
        assert_eq!(entry.key, "McCallum:2023");
    }

    #[test]
    fn test_update_cite_key() {
        let bibtex = "@ARTICLE{2023ApJ...999...1M,\n  title = {X}\n}";
        let updated = update_cite_key(bibtex, "McCallum:2023");
        assert!(updated.starts_with("@ARTICLE{McCallum:2023,"));
        assert!(updated.contains("title = {X}"));
    }

    #[test]
    fn test_publication_status() {
        let published = r#"@ARTICLE{key,
  journal = {The Astrophysical Journal},
  doi = {10.3847/1538-4357/x},
  volume = {999}
}"#;
        let status = publication_status(published);
        assert!(status.published);
        assert_eq!(status.journal.as_deref(), Some("The Astrophysical Journal"));
        assert_eq!(status.doi.as_deref(), Some("10.3847/1538-4357/x"));
        assert_eq!(status.volume.as_deref(), Some("999"));

        let preprint = "@ARTICLE{key,\n  journal = {arXiv e-prints}\n}";
        let status = publication_status(preprint);
        assert!(!status.published);
        assert!(status.journal.is_none());
    }

    #[test]
    fn test_split_ads_export() {
        let export = r#"@ARTICLE{2023ApJ...999...1M,
       author = {{McCallum}, Jane},
        title = "{Halos}",
      journal = {\apj}
}

@ARTICLE{2024MNRAS.500...2I,
       author = {{Iyer}, Ravi},
        title = "{Winds}",
      journal = {\mnras}
}"#;
        let bibcodes = vec![
            "2023ApJ...999...1M".to_string(),
            "2024MNRAS.500...2I".to_string(),
            "2025Natur.600...3X".to_string(),
        ];
        let map = split_ads_export(export, &bibcodes);

        assert_eq!(map.len(), 2);
        assert!(map["2023ApJ...999...1M"].contains("Halos"));
        assert!(map["2024MNRAS.500...2I"].contains("Winds"));
        assert!(!map.contains_key("2025Natur.600...3X"));
    }

    #[test]
    fn test_split_ads_export_ampersand_bibcode() {
        // A&A bibcodes defeat strict parsers; the regex fallback catches them
        let export = "@ARTICLE{2019A&A...625A..13P,\n  title = \"{Winds}\"\n}";
        let bibcodes = vec!["2019A&A...625A..13P".to_string()];
        let map = split_ads_export(export, &bibcodes);
        assert!(map.contains_key("2019A&A...625A..13P"));
    }
}
