// Dictionary-free lemmatizer for English nouns.
//
// Mirrors what a WordNet lemmatizer does with its default noun part of
// speech: irregular plurals come from a table, regular plurals lose their
// suffix. There is no lexicon to confirm candidates against, so the rules are
// conservative and leave short words and Latin/Greek endings alone.
//
// Invariant: lemmatize(lemmatize(w)) == lemmatize(w). Every table value is
// either mapped to itself or ends in a letter no suffix rule touches, every
// suffix rule produces a word that no rule matches again, and a stripped word
// that lands on a table key is mapped through the table.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

static IRREGULAR: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("mice", "mouse"),
        ("lice", "louse"),
        ("geese", "goose"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("oxen", "ox"),
        ("people", "people"),
        ("lives", "life"),
        ("wives", "wife"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("loaves", "loaf"),
        ("thieves", "thief"),
        ("wolves", "wolf"),
        ("halves", "half"),
        ("calves", "calf"),
        ("shelves", "shelf"),
        ("selves", "self"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("analyses", "analysis"),
        ("crises", "crisis"),
        ("theses", "thesis"),
        ("diagnoses", "diagnosis"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("vertices", "vertex"),
        // "-ses" plurals whose singular already ends in "s"
        ("buses", "bus"),
        ("gases", "gas"),
        ("lenses", "lens"),
        ("viruses", "virus"),
        ("bonuses", "bonus"),
        ("campuses", "campus"),
        ("statuses", "status"),
        ("atlases", "atlas"),
        ("biases", "bias"),
        ("canvases", "canvas"),
        // words that look plural but are their own lemma
        ("news", "news"),
        ("series", "series"),
        ("species", "species"),
        ("physics", "physics"),
        ("mathematics", "mathematics"),
        ("politics", "politics"),
        ("economics", "economics"),
        ("ethics", "ethics"),
        ("graphics", "graphics"),
        ("electronics", "electronics"),
        ("lens", "lens"),
        ("atlas", "atlas"),
        ("bias", "bias"),
        ("canvas", "canvas"),
        ("christmas", "christmas"),
        ("jesus", "jesus"),
        ("windows", "windows"),
    ]
    .into_iter()
    .collect()
});

/// Suffixes that drop a trailing "es" rather than just "s".
const ES_SUFFIXES: [&str; 5] = ["sses", "ches", "shes", "xes", "zzes"];

/// Endings that keep their trailing "s" ("class", "virus", "analysis").
const KEEP_S_SUFFIXES: [&str; 3] = ["ss", "us", "is"];

/// Reduce a lowercase word to its noun lemma.
pub fn lemmatize(word: &str) -> String {
    if let Some(lemma) = IRREGULAR.get(word) {
        return (*lemma).to_string();
    }
    let candidate = strip_plural(word);
    match IRREGULAR.get(candidate.as_ref()) {
        Some(lemma) => (*lemma).to_string(),
        None => candidate.into_owned(),
    }
}

fn strip_plural(word: &str) -> Cow<'_, str> {
    if word.chars().count() <= 3 {
        return Cow::Borrowed(word);
    }

    if let Some(stem) = word.strip_suffix("ies") {
        if stem.chars().count() >= 2 {
            return Cow::Owned(format!("{stem}y"));
        }
    }

    if ES_SUFFIXES.iter().any(|suffix| word.ends_with(suffix)) {
        return Cow::Borrowed(&word[..word.len() - 2]);
    }

    if word.ends_with('s') && !KEEP_S_SUFFIXES.iter().any(|suffix| word.ends_with(suffix)) {
        return Cow::Borrowed(&word[..word.len() - 1]);
    }

    Cow::Borrowed(word)
}
