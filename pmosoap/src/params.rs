//! Paramètres ordonnés d'un appel SOAP
//!
//! A [`Params`] collection is an ordered list of key/value pairs. Insertion
//! order is significant: it is the order in which the elements appear inside
//! the method element of the envelope.

/// Un paramètre d'appel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Nom de l'élément XML
    pub key: String,

    /// Valeur textuelle
    pub value: String,

    /// When set, the value is written verbatim (pre-formed XML fragment)
    /// instead of being escaped.
    pub raw: bool,
}

impl Param {
    /// Crée un paramètre dont la valeur sera échappée
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            raw: false,
        }
    }

    /// Crée un paramètre dont la valeur sera écrite telle quelle
    pub fn raw(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            raw: true,
        }
    }

    /// Marque (ou démarque) la valeur comme XML brut
    pub fn set_raw(&mut self, raw: bool) {
        self.raw = raw;
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Collection ordonnée de paramètres, clés uniques
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    items: Vec<Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_param(key).map(Param::value)
    }

    /// Returns the whole parameter (value and raw flag) stored under `key`.
    pub fn get_param(&self, key: &str) -> Option<&Param> {
        self.items.iter().find(|p| p.key == key)
    }

    /// Upsert d'une valeur échappée.
    ///
    /// An existing key keeps its position and loses its raw flag; a new key
    /// is appended at the end.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.upsert(Param::new(key, value));
    }

    /// Upsert d'une valeur brute, même positionnement que [`Params::set`].
    pub fn set_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.upsert(Param::raw(key, value));
    }

    fn upsert(&mut self, param: Param) {
        match self.items.iter_mut().find(|p| p.key == param.key) {
            Some(existing) => {
                existing.value = param.value;
                existing.raw = param.raw;
            }
            None => self.items.push(param),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.items.iter()
    }

    /// Réordonne selon une liste de clés déclarée.
    ///
    /// Declared keys come first, in declared order; declared keys with no
    /// value are skipped. Every key missing from `order` follows, in insertion
    /// order. Nothing is dropped.
    pub fn ordered_by(&self, order: &[&str]) -> Params {
        let mut items = Vec::with_capacity(self.items.len());

        for key in order {
            if let Some(param) = self.get_param(key) {
                if !items.iter().any(|p: &Param| p.key == param.key) {
                    items.push(param.clone());
                }
            }
        }

        for param in &self.items {
            if !order.contains(&param.key.as_str()) {
                items.push(param.clone());
            }
        }

        Params { items }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

impl<K, V> From<Vec<(K, V)>> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_returns_latest_value() {
        let mut params = Params::new();
        params.set("ItemId", "1");
        params.set("ItemId", "2");

        assert_eq!(params.get("ItemId"), Some("2"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_set_keeps_position_of_existing_key() {
        let mut params = Params::new();
        params.set("a", "1");
        params.set("b", "2");
        params.set("a", "3");

        let keys: Vec<&str> = params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some("3"));
    }

    #[test]
    fn test_len_grows_only_on_new_key() {
        let mut params = Params::new();
        for (i, key) in ["x", "y", "x", "z", "y"].iter().enumerate() {
            params.set(*key, i.to_string());
        }
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_get_missing_key() {
        let params: Params = vec![("a", "1")].into();
        assert_eq!(params.get("b"), None);
    }

    #[test]
    fn test_raw_flag_is_explicit() {
        let mut params = Params::new();
        params.set("Plain", "##RawToken:<x/>");
        params.set_raw("Fragment", "<x/>");

        let plain = params.get_param("Plain").unwrap();
        assert!(!plain.is_raw());
        assert_eq!(plain.value(), "##RawToken:<x/>");

        let fragment = params.get_param("Fragment").unwrap();
        assert!(fragment.is_raw());
        assert_eq!(fragment.value(), "<x/>");
    }

    #[test]
    fn test_set_clears_raw_flag() {
        let mut params = Params::new();
        params.set_raw("a", "<b/>");
        params.set("a", "text");
        assert!(!params.get_param("a").unwrap().is_raw());

        let mut param = Param::new("k", "v");
        param.set_raw(true);
        assert!(param.is_raw());
        param.set_raw(false);
        assert!(!param.is_raw());
        assert_eq!(param.value(), "v");
    }

    #[test]
    fn test_ordered_by_declared_order_then_insertion_order() {
        let params: Params = vec![("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")].into();

        let ordered = params.ordered_by(&["c", "missing", "a"]);
        let keys: Vec<&str> = ordered.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b", "d"]);
        assert_eq!(ordered.len(), params.len());
    }
}
