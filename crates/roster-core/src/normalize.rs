//! Normalization applied to directory data before it reaches the marketing
//! service.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::person::Person;

/// Characters kept in free-text fields: ASCII letters, digits, whitespace.
static DISALLOWED_TEXT_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"));

/// Trim and lower-case an email. Returns `None` for blank input.
pub fn normalize_email(raw: &str) -> Option<String> {
  let email = raw.trim().to_lowercase();
  (!email.is_empty()).then_some(email)
}

/// Strip every character other than letters, digits and whitespace, then
/// trim.
pub fn sanitize_text(raw: &str) -> String {
  DISALLOWED_TEXT_CHARS.replace_all(raw, "").trim().to_string()
}

/// Reduce people to one canonical record per normalized email.
///
/// People without an email are dropped. When several people share an email,
/// the one with the lowest id wins. The returned records carry the
/// normalized email and keep the order in which each email first appeared.
pub fn canonical_people(people: impl IntoIterator<Item = Person>) -> Vec<Person> {
  let mut canonical: Vec<Person> = Vec::new();
  let mut index_by_email: HashMap<String, usize> = HashMap::new();

  for mut person in people {
    let Some(email) = person.email.as_deref().and_then(normalize_email) else {
      continue;
    };
    person.email = Some(email.clone());

    match index_by_email.get(&email) {
      Some(&idx) => {
        if person.id < canonical[idx].id {
          canonical[idx] = person;
        }
      }
      None => {
        index_by_email.insert(email, canonical.len());
        canonical.push(person);
      }
    }
  }

  canonical
}
