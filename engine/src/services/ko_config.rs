//! Knock-out phase configuration for groups-then-KO categories.
//!
//! The configuration travels as a semicolon-delimited string
//! `"<start-level>;<second-survives 0/1>;<num-groups>;<group-size>;...;"`
//! where the start level names the first KO round (`L16`, `Q` or `S`).

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KoStartLevel {
    L16,
    Quarter,
    Semi,
}

impl KoStartLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KoStartLevel::L16 => "L16",
            KoStartLevel::Quarter => "Q",
            KoStartLevel::Semi => "S",
        }
    }

    /// Pairs entering the first KO round.
    pub fn num_qualifiers(&self) -> i64 {
        match self {
            KoStartLevel::L16 => 16,
            KoStartLevel::Quarter => 8,
            KoStartLevel::Semi => 4,
        }
    }

    /// KO rounds up to and including the final.
    pub fn num_rounds(&self) -> i64 {
        match self {
            KoStartLevel::L16 => 4,
            KoStartLevel::Quarter => 3,
            KoStartLevel::Semi => 2,
        }
    }
}

/// One uniform block of round-robin groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupDef {
    pub num_groups: i64,
    pub group_size: i64,
}

impl GroupDef {
    pub fn new(num_groups: i64, group_size: i64) -> Result<Self> {
        if group_size < 3 || num_groups < 1 {
            return Err(Error::InvalidKoConfig);
        }
        Ok(GroupDef {
            num_groups,
            group_size,
        })
    }

    /// Round-robin matches across all groups of this block:
    /// `s * (s + 1) / 2 - s` per group.
    pub fn num_matches(&self) -> i64 {
        let s = self.group_size;
        let per_group = (s * (s + 1)) / 2 - s;
        per_group * self.num_groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KoConfig {
    pub start_level: KoStartLevel,
    pub second_survives: bool,
    pub group_defs: Vec<GroupDef>,
}

impl KoConfig {
    pub fn new(
        start_level: KoStartLevel,
        second_survives: bool,
        group_defs: Vec<GroupDef>,
    ) -> Self {
        KoConfig {
            start_level,
            second_survives,
            group_defs,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // at least two separators, and group definitions come in pairs
        let num_semicolons = raw.matches(';').count();
        if num_semicolons < 2 || num_semicolons % 2 != 0 {
            return Err(Error::InvalidKoConfig);
        }

        let fields: Vec<&str> = raw.split(';').map(str::trim).collect();

        let start_level = match fields[0] {
            "L16" => KoStartLevel::L16,
            "Q" => KoStartLevel::Quarter,
            "S" => KoStartLevel::Semi,
            _ => return Err(Error::InvalidKoConfig),
        };

        let second_survives = match fields[1] {
            "0" => false,
            "1" => true,
            _ => return Err(Error::InvalidKoConfig),
        };

        let mut group_defs = Vec::new();
        let mut i = 2;
        while i + 1 < fields.len() - 1 {
            let num_groups: i64 = fields[i].parse().map_err(|_| Error::InvalidKoConfig)?;
            let group_size: i64 = fields[i + 1].parse().map_err(|_| Error::InvalidKoConfig)?;
            group_defs.push(GroupDef::new(num_groups, group_size)?);
            i += 2;
        }

        Ok(KoConfig {
            start_level,
            second_survives,
            group_defs,
        })
    }

    pub fn num_groups(&self) -> i64 {
        self.group_defs.iter().map(|g| g.num_groups).sum()
    }

    /// Total pairs the group phase can seat.
    pub fn capacity(&self) -> i64 {
        self.group_defs
            .iter()
            .map(|g| g.num_groups * g.group_size)
            .sum()
    }

    /// Groups required to feed the configured first KO round.
    pub fn required_groups(&self) -> i64 {
        let q = self.start_level.num_qualifiers();
        if self.second_survives { q / 2 } else { q }
    }

    /// A configuration is valid for a category when the group count feeds
    /// the KO bracket exactly and every pair has a seat.
    pub fn is_valid(&self, num_pairs: i64) -> bool {
        self.num_groups() == self.required_groups() && self.capacity() == num_pairs
    }

    /// Rounds of the group phase: the largest group dictates the schedule.
    pub fn num_group_rounds(&self) -> i64 {
        self.group_defs
            .iter()
            .map(|g| {
                if g.group_size % 2 == 0 {
                    g.group_size - 1
                } else {
                    g.group_size
                }
            })
            .max()
            .unwrap_or(0)
    }

    pub fn num_group_matches(&self) -> i64 {
        self.group_defs.iter().map(|g| g.num_matches()).sum()
    }

    /// All matches, group phase plus KO phase (finals and third place
    /// included).
    pub fn num_matches(&self) -> i64 {
        let ko = match self.start_level {
            KoStartLevel::Semi => 2 + 2,
            KoStartLevel::Quarter => 2 + 2 + 4,
            KoStartLevel::L16 => 2 + 2 + 4 + 8,
        };
        ko + self.num_group_matches()
    }

    /// Serialises back to the wire format; `parse` round-trips this.
    pub fn to_config_string(&self) -> String {
        let mut result = format!(
            "{};{};",
            self.start_level.as_str(),
            if self.second_survives { "1" } else { "0" }
        );
        for def in &self.group_defs {
            result.push_str(&format!("{};{};", def.num_groups, def.group_size));
        }
        result
    }
}
