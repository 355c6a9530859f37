//! Program resource names of the form `name[index]`.

use nom::{
    character::complete::{char, digit1},
    combinator::all_consuming,
    sequence::delimited,
    IResult,
};

fn index_suffix(input: &str) -> IResult<&str, &str> {
    all_consuming(delimited(char('['), digit1, char(']')))(input)
}

/// Parse the trailing array index of a resource name.
///
/// Returns the index and the length of the base name. When the name does
/// not end in `[<digits>]` the index is -1 and the base name is the whole
/// string. Only the last bracket group is parsed; anything before it stays
/// in the base name unchecked.
///
/// ```
/// use lpc_link::parse_program_resource_name;
///
/// assert_eq!(parse_program_resource_name("lights[2]"), (2, 6));
/// assert_eq!(parse_program_resource_name("lights"), (-1, 6));
/// ```
pub fn parse_program_resource_name(name: &str) -> (i64, usize) {
    let no_index = (-1, name.len());
    if !name.ends_with(']') {
        return no_index;
    }
    let Some(open) = name.rfind('[') else {
        return no_index;
    };
    let Ok((_, digits)) = index_suffix(&name[open..]) else {
        return no_index;
    };
    match digits.parse::<i64>() {
        Ok(index) => (index, open),
        Err(_) => no_index,
    }
}

/// Split a resource name into its base name and optional index.
pub fn split_resource_name(name: &str) -> (&str, Option<u32>) {
    let (index, end) = parse_program_resource_name(name);
    match u32::try_from(index) {
        Ok(index) => (&name[..end], Some(index)),
        Err(_) => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(parse_program_resource_name("foo"), (-1, 3));
        assert_eq!(parse_program_resource_name(""), (-1, 0));
    }

    #[test]
    fn test_indexed_name() {
        assert_eq!(parse_program_resource_name("foo[3]"), (3, 3));
        assert_eq!(parse_program_resource_name("foo[03]"), (3, 3));
        assert_eq!(parse_program_resource_name("s.a[1].b[12]"), (12, 8));
    }

    #[test]
    fn test_malformed_suffix() {
        assert_eq!(parse_program_resource_name("foo[]"), (-1, 5));
        assert_eq!(parse_program_resource_name("]"), (-1, 1));
        assert_eq!(parse_program_resource_name("foo[ 3]"), (-1, 7));
        assert_eq!(parse_program_resource_name("foo[-3]"), (-1, 7));
        assert_eq!(parse_program_resource_name("foo[x]"), (-1, 6));
        assert_eq!(parse_program_resource_name("foo3]"), (-1, 5));
    }

    #[test]
    fn test_overflowing_index() {
        let name = "foo[99999999999999999999999]";
        assert_eq!(parse_program_resource_name(name), (-1, name.len()));
    }

    #[test]
    fn test_split() {
        assert_eq!(split_resource_name("a[4]"), ("a", Some(4)));
        assert_eq!(split_resource_name("a"), ("a", None));
        assert_eq!(split_resource_name("a[]"), ("a[]", None));
    }
}
