//! Fixed domain policy: custom-field keys and conference mappings.

use std::sync::LazyLock;

use regex::Regex;

// ─── Custom fields ───────────────────────────────────────────────────────────

pub const PILGRIM_ID_FIELD: &str = "{$pilgrim_id}";
pub const CHURCH_FIELD: &str = "{$church}";
pub const WEEKENDS_SERVED_FIELD: &str = "{$number_of_weekends_served}";

/// Which weekend a set of weekend fields describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekend {
  /// The weekend the person attended as a guest.
  Guest,
  /// The person's most recent weekend.
  Last,
}

impl Weekend {
  fn prefix(self) -> &'static str {
    match self {
      Weekend::Guest => "guest",
      Weekend::Last => "last",
    }
  }

  pub fn number_field(self) -> String {
    format!("{{${}_weekend_number}}", self.prefix())
  }

  pub fn date_field(self) -> String {
    format!("{{${}_weekend_date}}", self.prefix())
  }

  pub fn location_field(self) -> String {
    format!("{{${}_weekend_location}}", self.prefix())
  }
}

// ─── Conferences ─────────────────────────────────────────────────────────────

pub const PIEDMONT: &str = "Piedmont";
pub const WESTERN: &str = "Western";
pub const EASTERN: &str = "Eastern";

/// The conference a weekend location belongs to.
pub fn conference_for_location(location: &str) -> Option<&'static str> {
  match location {
    "Camp Weaver"
    | "Camp Hanes"
    | "Camp New Hope"
    | "Laurel Ridge Moravian Conference Center"
    | "Camp Dogwood" => Some(PIEDMONT),
    "Camp Harrison" => Some(WESTERN),
    "Camp Dixie" => Some(EASTERN),
    _ => None,
  }
}

static CONFERENCE_NEWSLETTER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(Piedmont|Western|Eastern) Conference$").expect("valid regex")
});

/// The conference a newsletter is dedicated to, judged by its label
/// (e.g. `"Western Conference"` → `"Western"`).
pub fn conference_for_newsletter(label: &str) -> Option<&str> {
  CONFERENCE_NEWSLETTER
    .captures(label)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str())
}
