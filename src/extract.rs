use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const SEARCH_RESULTS: &str = ".search-results";
pub const CLUB_LIST: &str = ".search-club-list";
pub const NO_RESULT: &str = ".no_result_club";
pub const NO_RESULT_PHRASE: &str = "Aucun résultat pour votre recherche";

const CLUB_ENTRY: &str = ".search-club-list > *";
const CLUB_NAME: &str = ".name-club";
const CLUB_LOGO: &str = ".logo-club img";

/// One club card as rendered in the search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The site explicitly answered that nothing matches.
    NoResults,
    Entries(Vec<ResultEntry>),
    /// Nothing usable could be read, e.g. the results never showed up.
    Failed(String),
}

impl ResultEntry {
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && !self.logo_url.is_empty()
    }
}

/// Parse the rendered result region of a search.
///
/// `base` resolves relative logo sources. A "no results" marker only counts
/// when it carries the expected phrase, otherwise the cards are read as usual.
pub fn parse_results(html: &str, base: &Url) -> SearchOutcome {
    let fragment = Html::parse_fragment(html);

    let no_result = fragment
        .select(&Selector::parse(NO_RESULT).unwrap())
        .next()
        .map(|node| node.text().collect::<String>());
    if let Some(text) = no_result {
        if text.contains(NO_RESULT_PHRASE) {
            return SearchOutcome::NoResults;
        }
        debug!(marker = %normalize(&text), "no result marker without expected phrase");
    }

    let entries = fragment
        .select(&Selector::parse(CLUB_ENTRY).unwrap())
        .map(|card| parse_entry(card, base))
        .collect();

    SearchOutcome::Entries(entries)
}

fn parse_entry(card: ElementRef, base: &Url) -> ResultEntry {
    let name = card
        .select(&Selector::parse(CLUB_NAME).unwrap())
        .next()
        .map(|node| normalize(&node.text().collect::<String>()))
        .unwrap_or_default();

    let logo_url = card
        .select(&Selector::parse(CLUB_LOGO).unwrap())
        .next()
        .and_then(|img| logo_source(img.value().attr("src"), img.value().attr("data-src")))
        .map(|src| resolve(base, src))
        .unwrap_or_default();

    ResultEntry { name, logo_url }
}

// Lazy loaded images keep a data: placeholder in src until scrolled into view.
fn logo_source<'a>(src: Option<&'a str>, data_src: Option<&'a str>) -> Option<&'a str> {
    let src = src.map(str::trim).filter(|s| !s.is_empty());
    let data_src = data_src.map(str::trim).filter(|s| !s.is_empty());
    match src {
        Some(s) if s.starts_with("data:") => data_src.or(Some(s)),
        Some(s) => Some(s),
        None => data_src,
    }
}

fn resolve(base: &Url, src: &str) -> String {
    base.join(src)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| src.to_string())
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
