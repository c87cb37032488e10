//! Fixed tables the prompt builders draw from: the rating rubric, ensemble
//! sizes, and the framing for the known singer pairs.

use crate::core::state::{Singer, SongRating, ANNELIES, EMMA, FANNIE, MIRANDA};

impl SongRating {
    /// One explanatory sentence per tier, as listed in every rubric.
    pub fn rubric(&self) -> &'static str {
        match self {
            SongRating::G => "Suitable for all audiences. No mature themes.",
            SongRating::Pg => "Parental guidance suggested. May contain mild thematic elements.",
            SongRating::Pg13 => "Parents strongly cautioned. May contain some suggestive themes, brief strong language, or non-graphic allusions to mature topics.",
            SongRating::R => "Restricted. May contain strong language, mature themes, and non-explicit references to violence or sensuality.",
            SongRating::Nc17 => "Adults only. Can explore themes of violence and eroticism in an artistic, non-gratuitous way. Polite but explicit names for body parts and specific acts can be used.",
        }
    }
}

/// The rating header followed by the full five-tier rubric. `subject` is
/// what must adhere ("narrative", "song").
pub fn rating_instruction(rating: SongRating, subject: &str) -> String {
    let mut out = format!(
        "**Content Rating:** The {} must adhere to a \"{}\" rating.",
        subject, rating
    );
    for tier in SongRating::ALL {
        out.push_str(&format!("\n- {}: {}", tier, tier.rubric()));
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ensemble {
    Solo,
    Duet,
    Choir,
}

impl Ensemble {
    pub fn of(singers: &[Singer]) -> Self {
        match singers.len() {
            0 | 1 => Ensemble::Solo,
            2 => Ensemble::Duet,
            _ => Ensemble::Choir,
        }
    }
}

/// Framing for a known group of singers, phrased for each prompt that uses it.
#[derive(Debug)]
pub struct Relationship {
    pub members: &'static [&'static str],
    pub topic_context: &'static str,
    pub lyrics_context: &'static str,
    pub image_subject: &'static str,
}

impl Relationship {
    fn matches(&self, singers: &[Singer]) -> bool {
        singers.len() == self.members.len()
            && self
                .members
                .iter()
                .all(|m| singers.iter().any(|s| s.name == *m))
    }
}

pub static RELATIONSHIPS: [Relationship; 2] = [
    Relationship {
        members: &[MIRANDA, ANNELIES],
        topic_context: "The performers, Miranda and Annelies, are a romantic couple. Their music often reflects their deep, romantic bond.",
        lyrics_context: "This song is for the couple Miranda and Annelies. The lyrics should reflect their deep, romantic bond.",
        image_subject: "The image should feature the female music duet and romantic couple, Miranda Noor and Annelies Brink, performing together. Capture their deep connection and intimacy.",
    },
    Relationship {
        members: &[FANNIE, EMMA],
        topic_context: "The performers, Fannie and Emma, are close friends. Their music often reflects their intimate and playful chemistry.",
        lyrics_context: "This song is for the close friends Fannie and Emma. The lyrics should reflect their intimate and playful chemistry.",
        image_subject: "The image should feature the female music duet and close friends, Fannie de Jong and Emma Vermeer, performing together. Their bond is playful and intimate.",
    },
];

pub static FULL_GROUP: Relationship = Relationship {
    members: &[MIRANDA, ANNELIES, FANNIE, EMMA],
    topic_context: "The group consists of two pairs: the romantic couple Miranda and Annelies, and the playful, close friends Fannie and Emma. You can draw on these dynamics.",
    lyrics_context: "The group consists of two pairs: the romantic couple Miranda and Annelies, and the playful, close friends Fannie and Emma. The lyrics can explore the dynamics within and between these pairs.",
    image_subject: "The image should feature the full female musical group of 4 women: Miranda Noor, Annelies Brink, Fannie de Jong, and Emma Vermeer. Depict Miranda and Annelies as a couple, and Fannie and Emma as close friends.",
};

/// Known framing for this exact line-up, if any. Pairs only apply to duets
/// and the full group only to all four singers.
pub fn relationship_for(singers: &[Singer]) -> Option<&'static Relationship> {
    match singers.len() {
        2 => RELATIONSHIPS.iter().find(|r| r.matches(singers)),
        4 if FULL_GROUP.matches(singers) => Some(&FULL_GROUP),
        _ => None,
    }
}

pub const TOPIC_SAPPHIC_SENSIBILITY: &str = "A consistent underlying theme for all their songs is a subtle sapphic sensibility, exploring love and connection from a female perspective.";
pub const LYRICS_SAPPHIC_SENSIBILITY: &str = "A consistent underlying theme for all their songs is a subtle sapphic sensibility; the lyrics should reflect this, exploring themes of love, connection, and identity from a female perspective, regardless of the main topic.";

pub const LEAD_SINGERS: [&str; 2] = [MIRANDA, ANNELIES];
pub const BACKGROUND_SINGERS: [&str; 2] = [FANNIE, EMMA];

/// "Performer Roles: ..." sentence, empty when no known singer is present.
pub fn roles_instruction(singers: &[Singer]) -> String {
    let pick = |set: &[&str]| -> Vec<&str> {
        singers
            .iter()
            .filter(|s| set.contains(&s.name.as_str()))
            .map(|s| s.name.as_str())
            .collect()
    };
    let leads = pick(&LEAD_SINGERS);
    let background = pick(&BACKGROUND_SINGERS);

    let mut parts = Vec::new();
    if !leads.is_empty() {
        let verb = if leads.len() == 1 {
            "is a main singer."
        } else {
            "are main singers."
        };
        parts.push(format!("{} {}", leads.join(" and "), verb));
    }
    if !background.is_empty() {
        let verb = if background.len() == 1 {
            "is a background singer and will perform any rap lyrics."
        } else {
            "are background singers and will perform any rap lyrics."
        };
        parts.push(format!("{} {}", background.join(" and "), verb));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("Performer Roles: {}", parts.join(" "))
    }
}
