//! Built-in screening lists. Operator-supplied lists replace these.

use std::collections::{BTreeMap, HashMap, HashSet};

use phf::{phf_map, phf_set};

pub(crate) static DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "10minutemail.com",
    "burnermail.io",
    "discard.email",
    "dispostable.com",
    "emailondeck.com",
    "fakeinbox.com",
    "getnada.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "mailinator.com",
    "maildrop.cc",
    "mailnesia.com",
    "mintemail.com",
    "mohmal.com",
    "sharklasers.com",
    "spamgourmet.com",
    "temp-mail.org",
    "tempmail.com",
    "throwawaymail.com",
    "trashmail.com",
    "yopmail.com",
};

pub(crate) static ROLE_ACCOUNTS: phf::Set<&'static str> = phf_set! {
    "abuse",
    "admin",
    "administrator",
    "billing",
    "contact",
    "help",
    "hostmaster",
    "info",
    "marketing",
    "no-reply",
    "noreply",
    "office",
    "postmaster",
    "root",
    "sales",
    "security",
    "support",
    "team",
    "webmaster",
};

pub(crate) static TYPO_DOMAINS: phf::Map<&'static str, &'static str> = phf_map! {
    "gmial.com" => "gmail.com",
    "gmai.com" => "gmail.com",
    "gamil.com" => "gmail.com",
    "gnail.com" => "gmail.com",
    "gmail.co" => "gmail.com",
    "gmail.con" => "gmail.com",
    "hotmial.com" => "hotmail.com",
    "hotmai.com" => "hotmail.com",
    "hotmail.con" => "hotmail.com",
    "yaho.com" => "yahoo.com",
    "yahooo.com" => "yahoo.com",
    "yahoo.con" => "yahoo.com",
    "outlok.com" => "outlook.com",
    "outloo.com" => "outlook.com",
    "outlook.con" => "outlook.com",
    "iclod.com" => "icloud.com",
    "icloud.con" => "icloud.com",
};

#[derive(Debug, Clone)]
pub(crate) enum WordList {
    Builtin(&'static phf::Set<&'static str>),
    Custom(HashSet<String>),
}

impl WordList {
    pub(crate) fn custom(words: &[String]) -> Self {
        Self::Custom(
            words
                .iter()
                .map(|w| w.trim().trim_start_matches("*.").trim_start_matches('.').to_ascii_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    pub(crate) fn contains(&self, word: &str) -> bool {
        match self {
            Self::Builtin(set) => set.contains(word),
            Self::Custom(set) => set.contains(word),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TypoMap {
    Builtin(&'static phf::Map<&'static str, &'static str>),
    Custom(HashMap<String, String>),
}

impl TypoMap {
    pub(crate) fn custom(pairs: &BTreeMap<String, String>) -> Self {
        Self::Custom(
            pairs
                .iter()
                .map(|(from, to)| (from.trim().to_ascii_lowercase(), to.trim().to_ascii_lowercase()))
                .filter(|(from, to)| !from.is_empty() && !to.is_empty())
                .collect(),
        )
    }

    pub(crate) fn get(&self, domain: &str) -> Option<&str> {
        match self {
            Self::Builtin(map) => map.get(domain).copied(),
            Self::Custom(map) => map.get(domain).map(String::as_str),
        }
    }
}
