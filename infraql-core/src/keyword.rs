// Keyword table layout follows sqlparser-rs style sorted tables so that
// lookup can use binary search.

/// Defines a string constant for a single keyword: `kw_def!(SELECT);`,
/// which expands to `const SELECT: &'static str = "SELECT";`
macro_rules! kw_def {
    ($ident:ident) => {
        const $ident: &'static str = stringify!($ident);
    };
}

/// Expands to a list of `kw_def!()` invocations for each keyword, the
/// `Keyword` enum itself and the sorted `ALL_KEYWORDS`/`ALL_KEYWORD_STRINGS`
/// tables.
///
/// **NOTE**: All keywords must be sorted to be able to match using binary search.
macro_rules! define_keywords {
    ( $( $keyword:ident ),* $(,)? ) => {
        /// A reserved word of the query language.
        #[allow(non_camel_case_types)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Keyword {
            $(
                #[doc(hidden)]
                $keyword
            ),*
        }

        impl ::core::fmt::Display for Keyword {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Debug::fmt(self, f)
            }
        }

        $( kw_def!($keyword); )*

        /// All keywords, in the same (sorted) order as [`ALL_KEYWORD_STRINGS`].
        pub const ALL_KEYWORDS: &[Keyword] = &[
            $(Keyword::$keyword),*
        ];

        /// The upper-case text of every keyword, sorted for binary search.
        pub const ALL_KEYWORD_STRINGS: &[&str] = &[
            $($keyword),*
        ];
    };
}

define_keywords!(
    AND,
    AS,
    ASC,
    AVG,
    BETWEEN,
    BY,
    CACHE,
    CLEAR,
    COUNT,
    DESC,
    DESCRIBE,
    FALSE,
    FROM,
    GROUP,
    HAVING,
    IN,
    INNER,
    JOIN,
    LEFT,
    LIKE,
    LIMIT,
    MAX,
    MIN,
    NULL,
    OFFSET,
    ON,
    OR,
    ORDER,
    OUTER,
    PLUGINS,
    RIGHT,
    SELECT,
    SET,
    SHOW,
    SOURCES,
    SUM,
    TABLES,
    THROUGH,
    TRACE,
    TRUE,
    TTL,
    WHERE,
);

impl Keyword {
    /// Looks up the keyword matching the given word, compared
    /// case-insensitively.
    pub fn lookup(word: &str) -> Option<Keyword> {
        #[cfg(not(feature = "std"))]
        use alloc::string::String;

        let upper: String = word.chars().map(|ch| ch.to_ascii_uppercase()).collect();
        ALL_KEYWORD_STRINGS
            .binary_search(&upper.as_str())
            .map(|idx| ALL_KEYWORDS[idx])
            .ok()
    }

    /// The canonical upper-case text of this keyword.
    pub fn canonical(&self) -> &'static str {
        match ALL_KEYWORDS.iter().position(|kw| kw == self) {
            Some(idx) => ALL_KEYWORD_STRINGS[idx],
            None => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_is_sorted() {
        let mut sorted = ALL_KEYWORD_STRINGS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ALL_KEYWORD_STRINGS);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("select"), Some(Keyword::SELECT));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::SELECT));
        assert_eq!(Keyword::lookup("services"), None);
        assert_eq!(Keyword::SELECT.canonical(), "SELECT");
    }
}
