use serde::{Deserialize, Deserializer};

/// One member row as served by the load source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "id_from_str_or_int")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Mutable fields of a member (everything except `id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Role,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Email, Field::Role];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Role => "Role",
        }
    }

    pub fn next(self) -> Field {
        match self {
            Field::Name => Field::Email,
            Field::Email => Field::Role,
            Field::Role => Field::Name,
        }
    }

    pub fn prev(self) -> Field {
        match self {
            Field::Name => Field::Role,
            Field::Email => Field::Name,
            Field::Role => Field::Email,
        }
    }
}

impl Member {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.into(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Role => &self.role,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Role => &mut self.role,
        };
        *slot = value.into();
    }

    /// Case-insensitive substring match against name, email or role.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || Field::ALL
                .iter()
                .any(|f| self.get(*f).to_lowercase().contains(needle))
    }
}

// The upstream feed sends ids as strings, other sources as numbers.
fn id_from_str_or_int<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match RawId::deserialize(de)? {
        RawId::Text(s) => s,
        RawId::Int(i) => i.to_string(),
        RawId::Uint(u) => u.to_string(),
    })
}
