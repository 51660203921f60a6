//! Table id scheme for the four competition sections, per §4.2/§4.5.
//!
//! The source page uses a fixed `stats_{kind}_{section}` naming convention for every
//! table it publishes, with `{kind}` drawn from the four parallel table families and
//! `{section}` one of the four competition scopes a player can have rows for. Listing
//! them here keeps the orchestrator and parser from hand-building id strings in more
//! than one place.

/// The four table families merged per section (C3).
pub const KIND_STANDARD: &str = "standard";
pub const KIND_SHOOTING: &str = "shooting";
pub const KIND_PLAYING_TIME: &str = "playing_time";
pub const KIND_KEEPER: &str = "keeper";

pub const ALL_KINDS: [&str; 4] = [KIND_STANDARD, KIND_SHOOTING, KIND_PLAYING_TIME, KIND_KEEPER];

/// The four competition sections a player page can carry (I1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    DomesticLeague,
    DomesticCup,
    InternationalCup,
    NationalTeam,
}

impl Section {
    pub fn id_fragment(&self) -> &'static str {
        match self {
            Section::DomesticLeague => "dom_lg",
            Section::DomesticCup => "dom_cup",
            Section::InternationalCup => "intl_cup",
            Section::NationalTeam => "nat_tm",
        }
    }

    pub fn all() -> [Section; 4] {
        [Section::DomesticLeague, Section::DomesticCup, Section::InternationalCup, Section::NationalTeam]
    }
}

/// Builds the `stats_{kind}_{section}` table id for a given family and section.
pub fn table_id(kind: &str, section: Section) -> String {
    format!("stats_{kind}_{}", section.id_fragment())
}

/// All 16 table ids (4 kinds x 4 sections) a full player page fetch should look for.
pub fn all_table_ids() -> Vec<String> {
    let mut ids = Vec::with_capacity(16);
    for section in Section::all() {
        for kind in ALL_KINDS {
            ids.push(table_id(kind, section));
        }
    }
    ids
}
