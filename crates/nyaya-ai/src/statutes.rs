//! Built-in table of Indian statutes and keyword lookup over it.

use serde::Serialize;

/// One statute with the sections the table knows about.
#[derive(Debug)]
pub struct LegalCode {
    pub code: &'static str,
    pub name: &'static str,
    pub sections: &'static [(&'static str, &'static str)],
}

pub const LEGAL_CODES: &[LegalCode] = &[
    LegalCode {
        code: "IPC",
        name: "Indian Penal Code",
        sections: &[
            ("34", "Acts done by several persons in furtherance of common intention"),
            ("73", "When breach of contract - compensation for loss or damage"),
            ("420", "Cheating and dishonestly inducing delivery of property"),
            ("408", "Dishonest misappropriation of property"),
            ("506", "Criminal intimidation"),
            ("507", "Criminal intimidation by an anonymous communication"),
        ],
    },
    LegalCode {
        code: "ICA",
        name: "Indian Contract Act, 1872",
        sections: &[
            ("10", "Agreement to sell may be absolute or conditional"),
            ("12", "Consideration must not be illegal"),
            ("14", "Acceptance must be absolute"),
            ("23", "Consideration and object must be lawful"),
            ("32", "Mode of communication by act"),
            ("40", "When acceptance is complete as against acceptor"),
            ("55", "Effect of condition in agreement to sell"),
            ("73", "Compensation for breach of contract"),
            ("74", "Penalty clause - not enforceable as penalty"),
            ("76", "Agreement for sale of goods"),
        ],
    },
    LegalCode {
        code: "IEA",
        name: "Indian Evidence Act, 1872",
        sections: &[
            ("3", "Relevancy defined"),
            ("5", "Relevancy of facts forming part of same transaction"),
            ("11", "Admissions"),
            ("17", "Confessions caused by inducement"),
            ("60", "Primary evidence"),
            ("62", "Original documents"),
        ],
    },
    LegalCode {
        code: "CrPC",
        name: "Code of Criminal Procedure",
        sections: &[
            ("41", "Police to arrest without warrant in certain cases"),
            ("161", "Examination of witness by police"),
            ("251", "Examination of accused"),
            ("359", "Suspension of sentence by appellate court"),
            ("360", "Conditional discharge of first offender"),
        ],
    },
    LegalCode {
        code: "SA",
        name: "Specific Relief Act, 1963",
        sections: &[
            ("10", "Specific performance of contract"),
            ("11", "Effect of breach of contract"),
            ("12", "Discretion to award damages"),
            ("15", "Rectification of instruments"),
        ],
    },
    LegalCode {
        code: "LA",
        name: "Limitation Act, 1963",
        sections: &[
            ("3", "Establishment of bar of limitation"),
            ("14", "Extension of period in certain cases"),
            ("29", "Effect of substitution"),
        ],
    },
    LegalCode {
        code: "FA",
        name: "Family Laws (Marriage, Divorce, Succession)",
        sections: &[
            ("13", "Divorce - grounds and procedures"),
            ("24", "Maintenance during marriage proceedings"),
            ("25", "Maintenance after divorce"),
        ],
    },
    LegalCode {
        code: "MV",
        name: "Motor Vehicles Act, 1988",
        sections: &[
            ("140", "Insurer's liability for judgment debts"),
            ("166", "Compensation for death or permanent disablement"),
        ],
    },
];

/// Case-text vocabulary that maps onto statute descriptions.
const KEYWORDS: &[&str] = &[
    "breach",
    "contract",
    "compensation",
    "damages",
    "specific performance",
    "fraud",
    "cheating",
    "misrepresentation",
    "property",
    "title",
    "inheritance",
    "succession",
    "divorce",
    "maintenance",
    "custody",
    "accident",
    "injury",
    "death",
    "negligence",
    "criminal",
];

/// A statute section matched by keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatuteMatch {
    pub code: &'static str,
    pub law_name: &'static str,
    pub section: &'static str,
    pub description: &'static str,
    pub relevance_score: f64,
}

impl StatuteMatch {
    /// `"IPC 420 (Indian Penal Code): Cheating and ..."`
    pub fn display_line(&self) -> String {
        format!(
            "{} {} ({}): {}",
            self.code, self.section, self.law_name, self.description
        )
    }
}

/// Vocabulary keywords that occur in `text` (case-insensitive), in
/// vocabulary order.
pub fn extract_keywords(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect()
}

/// Sections whose description or statute name contains any keyword.
///
/// Each section appears at most once, in table order.
pub fn search_sections(keywords: &[&str]) -> Vec<StatuteMatch> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let mut matches = Vec::new();
    for code in LEGAL_CODES {
        let name = code.name.to_lowercase();
        for (section, description) in code.sections {
            let desc = description.to_lowercase();
            if keywords.iter().any(|kw| desc.contains(kw) || name.contains(kw)) {
                matches.push(StatuteMatch {
                    code: code.code,
                    law_name: code.name,
                    section,
                    description,
                    relevance_score: 0.8,
                });
            }
        }
    }
    matches
}
