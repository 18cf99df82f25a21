//! Jetons XML abstraits d'une enveloppe SOAP

/// One step of an envelope, before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Balise ouvrante avec ses attributs, dans l'ordre d'émission
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },

    /// Balise fermante
    End { name: String },

    /// Texte, échappé à l'encodage
    Text(String),

    /// Fragment XML écrit tel quel
    Raw(String),
}

impl Token {
    pub fn start(name: impl Into<String>) -> Self {
        Token::Start {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn start_with_attributes<K, V>(name: impl Into<String>, attributes: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Token::Start {
            name: name.into(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn end(name: impl Into<String>) -> Self {
        Token::End { name: name.into() }
    }
}
