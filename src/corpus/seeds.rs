//! Default labeled examples for a fresh corpus
//!
//! Five examples per quadrant, mixed English and Polish, matching the
//! bilingual task titles the classifier is tuned for.

use crate::types::{Example, Provenance, Quadrant};

/// Build the default seed set (20 examples, 5 per quadrant)
pub(crate) fn default_examples() -> Vec<Example> {
    let seeds: [(&str, Quadrant); 20] = [
        // Urgent + important
        ("urgent deadline tomorrow", Quadrant::DoNow),
        ("critical issue fix now", Quadrant::DoNow),
        ("pilny termin jutro", Quadrant::DoNow),
        ("krytyczny błąd do naprawienia zaraz", Quadrant::DoNow),
        ("emergency meeting", Quadrant::DoNow),
        // Urgent, not important
        ("schedule call later", Quadrant::Schedule),
        ("check emails tomorrow", Quadrant::Schedule),
        ("zobacz maile jutro", Quadrant::Schedule),
        ("zaplanuj spotkanie", Quadrant::Schedule),
        ("review documents", Quadrant::Schedule),
        // Important, not urgent
        ("prepare report", Quadrant::Delegate),
        ("strategize project", Quadrant::Delegate),
        ("przygotuj raport", Quadrant::Delegate),
        ("rozważ strategię projektu", Quadrant::Delegate),
        ("plan future goals", Quadrant::Delegate),
        // Neither
        ("delete old files", Quadrant::Delete),
        ("clean up cache", Quadrant::Delete),
        ("usuń stare pliki", Quadrant::Delete),
        ("wyczyść pamięć", Quadrant::Delete),
        ("ignore spam", Quadrant::Delete),
    ];

    seeds
        .into_iter()
        .map(|(text, label)| Example::new(text, label, Provenance::Default))
        .collect()
}
