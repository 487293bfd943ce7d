use core::fmt;

/// Displays a slice of displayable items separated by `", "`.
pub(crate) fn display_comma_separated<T>(slice: &[T]) -> impl fmt::Display + '_
where
    T: fmt::Display,
{
    struct CommaSeparated<'a, T>(&'a [T]);

    impl<'a, T: fmt::Display> fmt::Display for CommaSeparated<'a, T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut delim = "";
            for item in self.0 {
                write!(f, "{}{}", delim, item)?;
                delim = ", ";
            }
            Ok(())
        }
    }

    CommaSeparated(slice)
}
