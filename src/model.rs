use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use strum::{Display, EnumString};

use crate::extract::{ResultEntry, SearchOutcome};

/// What the query keys typed into the search box stand for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum QueryKind {
    #[default]
    #[strum(serialize = "club-name")]
    ClubName,
    #[strum(serialize = "postal-code")]
    PostalCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubLogo {
    pub club_name: String,
    pub logo_url: String,
}

/// Club name to logo URL, keeping the order in which clubs were first seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogoMap {
    entries: Vec<ClubLogo>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub logos: LogoMap,
    pub failed: Vec<String>,
}

impl LogoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the logo of a club, returning the previous URL.
    /// An overwritten club keeps its original position.
    pub fn insert(
        &mut self,
        club_name: impl Into<String>,
        logo_url: impl Into<String>,
    ) -> Option<String> {
        let club_name = club_name.into();
        let logo_url = logo_url.into();
        match self.index.get(&club_name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].logo_url, logo_url)),
            None => {
                self.index.insert(club_name.clone(), self.entries.len());
                self.entries.push(ClubLogo { club_name, logo_url });
                None
            }
        }
    }

    /// Record an empty logo for a club not seen yet. Returns false when the
    /// club already has an entry, which is left untouched.
    pub fn insert_placeholder(&mut self, club_name: &str) -> bool {
        if self.index.contains_key(club_name) {
            return false;
        }
        self.insert(club_name, "");
        true
    }

    pub fn get(&self, club_name: &str) -> Option<&str> {
        self.index
            .get(club_name)
            .map(|&pos| self.entries[pos].logo_url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClubLogo> {
        self.entries.iter()
    }

    pub fn sorted(&self) -> Vec<&ClubLogo> {
        let mut logos: Vec<_> = self.entries.iter().collect();
        logos.sort_by(|a, b| a.club_name.cmp(&b.club_name));
        logos
    }
}

impl Serialize for LogoMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_logos(self.entries.iter(), serializer)
    }
}

/// Serialize logos as a JSON object keyed by club name, in iteration order.
pub fn serialize_logos<'a, S, I>(logos: I, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: ExactSizeIterator<Item = &'a ClubLogo>,
{
    let mut map = serializer.serialize_map(Some(logos.len()))?;
    for logo in logos {
        map.serialize_entry(&logo.club_name, &logo.logo_url)?;
    }
    map.end()
}

impl RunResult {
    /// Fold the outcome of one search into the run.
    ///
    /// Returns the number of logos stored for the key. A "no results" page
    /// marks the key as failed and, for club names, reserves an empty entry.
    /// A failed search only marks the key. Entries lacking a name or a logo
    /// are dropped; when none is left, a club name still gets its empty entry
    /// but is not marked as failed.
    pub fn record(&mut self, key: &str, kind: QueryKind, outcome: SearchOutcome) -> usize {
        match outcome {
            SearchOutcome::NoResults => {
                self.failed.push(key.to_string());
                if kind == QueryKind::ClubName {
                    self.logos.insert_placeholder(key);
                }
                0
            }
            SearchOutcome::Failed(_) => {
                self.failed.push(key.to_string());
                0
            }
            SearchOutcome::Entries(entries) => {
                let mut stored = 0;
                for entry in entries.into_iter().filter(ResultEntry::is_usable) {
                    self.logos.insert(entry.name, entry.logo_url);
                    stored += 1;
                }
                if stored == 0 && kind == QueryKind::ClubName {
                    self.logos.insert_placeholder(key);
                }
                stored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, logo_url: &str) -> ResultEntry {
        ResultEntry {
            name: name.to_string(),
            logo_url: logo_url.to_string(),
        }
    }

    #[test]
    fn insert_should_overwrite_in_place() {
        let mut logos = LogoMap::new();
        assert_eq!(logos.insert("GF 38", "http://x/1.png"), None);
        logos.insert("EYBENS", "http://x/2.png");
        assert_eq!(
            logos.insert("GF 38", "http://x/3.png"),
            Some("http://x/1.png".to_string())
        );

        let names: Vec<_> = logos.iter().map(|l| l.club_name.as_str()).collect();
        assert_eq!(names, ["GF 38", "EYBENS"]);
        assert_eq!(logos.get("GF 38"), Some("http://x/3.png"));
        assert_eq!(logos.len(), 2);
    }

    #[test]
    fn placeholder_should_not_clobber_known_logo() {
        let mut logos = LogoMap::new();
        logos.insert("CROLLES", "http://x/crolles.png");
        assert!(!logos.insert_placeholder("CROLLES"));
        assert!(logos.insert_placeholder("FROGES"));
        assert_eq!(logos.get("CROLLES"), Some("http://x/crolles.png"));
        assert_eq!(logos.get("FROGES"), Some(""));
    }

    #[test]
    fn sorted_should_order_by_club_name() {
        let mut logos = LogoMap::new();
        logos.insert("VOREPPE", "v");
        logos.insert("ABBAYE", "a");
        logos.insert("MEYRIE", "m");
        let names: Vec<_> = logos.sorted().iter().map(|l| l.club_name.as_str()).collect();
        assert_eq!(names, ["ABBAYE", "MEYRIE", "VOREPPE"]);
    }

    #[test]
    fn record_postal_code_scenario() {
        let mut run = RunResult::default();
        let stored = run.record(
            "38000",
            QueryKind::PostalCode,
            SearchOutcome::Entries(vec![
                entry("CLUB A", "http://x/a.png"),
                entry("CLUB B", ""),
            ]),
        );
        assert_eq!(stored, 1);
        run.record("38100", QueryKind::PostalCode, SearchOutcome::NoResults);

        assert_eq!(run.logos.len(), 1);
        assert_eq!(run.logos.get("CLUB A"), Some("http://x/a.png"));
        assert_eq!(run.logos.get("CLUB B"), None);
        assert_eq!(run.logos.get("38100"), None);
        assert_eq!(run.failed, ["38100"]);
    }

    #[test]
    fn record_club_name_without_result_should_reserve_entry() {
        let mut run = RunResult::default();
        run.record("BALMES", QueryKind::ClubName, SearchOutcome::NoResults);
        assert_eq!(run.logos.get("BALMES"), Some(""));
        assert_eq!(run.failed, ["BALMES"]);
    }

    #[test]
    fn record_failed_search_should_only_mark_key() {
        let mut run = RunResult::default();
        run.record(
            "CESSIEU",
            QueryKind::ClubName,
            SearchOutcome::Failed("timed out".to_string()),
        );
        assert!(run.logos.is_empty());
        assert_eq!(run.failed, ["CESSIEU"]);
    }

    #[test]
    fn record_should_skip_entry_without_name() {
        let mut run = RunResult::default();
        let stored = run.record(
            "38500",
            QueryKind::PostalCode,
            SearchOutcome::Entries(vec![entry("", "http://x/anon.png")]),
        );
        assert_eq!(stored, 0);
        assert!(run.logos.is_empty());
        assert!(run.failed.is_empty());
    }

    #[test]
    fn record_club_name_without_usable_entry_should_reserve_entry() {
        let mut run = RunResult::default();
        run.record("CROLLES", QueryKind::ClubName, SearchOutcome::Entries(vec![]));
        let stored = run.record(
            "FROGES",
            QueryKind::ClubName,
            SearchOutcome::Entries(vec![entry("US FROGES", "")]),
        );

        assert_eq!(stored, 0);
        assert_eq!(run.logos.get("CROLLES"), Some(""));
        assert_eq!(run.logos.get("FROGES"), Some(""));
        assert_eq!(run.logos.get("US FROGES"), None);
        assert!(run.failed.is_empty());
    }

    #[test]
    fn query_kind_should_display_kebab_case() {
        assert_eq!(QueryKind::PostalCode.to_string(), "postal-code");
        assert_eq!("club-name".parse::<QueryKind>().unwrap(), QueryKind::ClubName);
    }
}
