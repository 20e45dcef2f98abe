//! Fixed round-robin color palette assigned to team members.

/// One of the eight colors in the member palette.
///
/// Assigned by [`crate::team_registry`] as `palette[len(members) % 8]`;
/// never chosen by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Violet,
    Gray,
}

const PALETTE: [AgentColor; 8] = [
    AgentColor::Red,
    AgentColor::Orange,
    AgentColor::Yellow,
    AgentColor::Green,
    AgentColor::Blue,
    AgentColor::Indigo,
    AgentColor::Violet,
    AgentColor::Gray,
];

impl AgentColor {
    /// Return the palette entry for the `index`-th member added to a team.
    pub fn for_member_index(index: usize) -> Self {
        PALETTE[index % PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps_round_robin() {
        assert_eq!(AgentColor::for_member_index(0), AgentColor::Red);
        assert_eq!(AgentColor::for_member_index(7), AgentColor::Gray);
        assert_eq!(AgentColor::for_member_index(8), AgentColor::Red);
        assert_eq!(AgentColor::for_member_index(9), AgentColor::Orange);
    }

    #[test]
    fn serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&AgentColor::Indigo).unwrap(),
            "\"indigo\""
        );
    }
}
