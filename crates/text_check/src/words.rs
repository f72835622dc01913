/// Built-in English word list. Lowercase, one entry per inflection.
pub(crate) const ENGLISH_WORDS: &[&str] = &[
    // Function words
    "a", "about", "above", "according", "after", "again", "against", "all", "also", "although",
    "am", "among", "an", "and", "any", "are", "as", "at", "be", "because", "been", "before",
    "being", "below", "between", "both", "but", "by", "can", "could", "did", "do", "does",
    "during", "each", "either", "every", "for", "from", "had", "has", "have", "having", "he",
    "her", "here", "hereby", "herein", "him", "his", "how", "however", "i", "if", "in", "into",
    "is", "it", "its", "may", "me", "might", "more", "most", "must", "my", "no", "nor", "not",
    "of", "on", "once", "only", "or", "other", "our", "out", "over", "per", "please", "regarding",
    "shall", "she", "should", "since", "so", "some", "such", "than", "that", "the", "their",
    "them", "then", "there", "therefore", "these", "they", "this", "those", "through", "thus",
    "to", "under", "until", "upon", "us", "very", "was", "we", "were", "what", "when", "where",
    "whether", "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours",
    // Common verbs
    "accept", "accepted", "apply", "applied", "applying", "approve", "approved", "ask", "asked",
    "attach", "attached", "become", "believe", "came", "come", "confirm", "confirmed",
    "consider", "considered", "contact", "continue", "demonstrate", "demonstrates", "describe",
    "enclose", "enclosed", "establish", "establishes", "explain", "file", "filed", "find",
    "follow", "following", "found", "get", "give", "given", "go", "have", "help", "hold",
    "include", "included", "including", "indicate", "indicates", "issue", "issued", "keep",
    "know", "live", "lived", "made", "make", "meet", "meets", "met", "note", "noted", "obtain",
    "obtained", "provide", "provided", "receive", "received", "request", "requested", "require",
    "required", "reside", "resided", "respond", "review", "reviewed", "see", "seek", "sent",
    "show", "shows", "sign", "signed", "submit", "submitted", "support", "supported", "take",
    "thank", "understand", "work", "worked", "write", "written",
    // Letters and correspondence
    "address", "applicant", "application", "attention", "attorney", "behalf", "beneficiary",
    "case", "copy", "correspondence", "date", "dear", "department", "document", "documents",
    "enclosure", "enclosures", "evidence", "exhibit", "file", "form", "letter", "matter",
    "notice", "officer", "page", "petition", "petitioner", "receipt", "record", "records",
    "reference", "regards", "response", "sincerely", "statement", "subject", "summary",
    "today", "truly",
    // Immigration
    "admission", "adjustment", "alien", "asylum", "border", "card", "citizen", "citizenship",
    "consular", "consulate", "country", "employment", "entry", "family", "green", "immigrant",
    "immigration", "interview", "lawful", "marriage", "nonimmigrant",
    "passport", "permanent", "petition", "relative", "residence", "resident", "spouse",
    "sponsor", "status", "travel", "visa", "waiver",
    // General nouns and adjectives
    "bona", "child", "children", "complete", "current", "day", "different", "early", "fact",
    "father", "first", "full", "good", "home", "important", "information", "joint", "last",
    "late", "life", "mother", "name", "new", "next", "office", "old", "order", "original",
    "own", "parent", "person", "personal", "prior", "public", "reason", "relationship",
    "same", "second", "several", "son", "daughter", "state", "states", "support", "time",
    "true", "united", "valid", "year", "years",
];

/// Words spelled differently in American and British English, as
/// `(en-US, en-GB)` pairs. Each dictionary loads only its own side.
pub(crate) const REGIONAL_SPELLINGS: &[(&str, &str)] = &[
    ("analyze", "analyse"),
    ("apologize", "apologise"),
    ("authorize", "authorise"),
    ("authorized", "authorised"),
    ("behavior", "behaviour"),
    ("catalog", "catalogue"),
    ("center", "centre"),
    ("color", "colour"),
    ("defense", "defence"),
    ("enroll", "enrol"),
    ("favor", "favour"),
    ("fulfill", "fulfil"),
    ("honor", "honour"),
    ("labor", "labour"),
    ("license", "licence"),
    ("naturalization", "naturalisation"),
    ("organization", "organisation"),
    ("program", "programme"),
    ("recognize", "recognise"),
    ("recognized", "recognised"),
    ("traveled", "travelled"),
    ("traveling", "travelling"),
];
