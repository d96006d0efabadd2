/// Nouns too broad to narrow a directory search on their own. Stored as
/// surface forms; the engine stems them once at construction.
pub const DEFAULT_GENERIC_NOUNS: &[&str] = &[
    "help", "service", "services", "assistance", "assist", "support", "program", "programs",
    "resource", "resources", "information", "info", "thing", "things", "stuff", "place",
    "places", "area", "location", "people", "person", "way", "option", "options", "provider",
    "providers", "organization", "agency", "center", "need", "needs", "problem", "issue",
    "issues", "question", "questions", "someone", "somewhere", "something", "anything",
    "type", "kind", "lot", "access", "aid", "benefit", "benefits",
];
