use pest::{
    error::Error,
    iterators::{Pair, Pairs},
    Parser,
};

/// Parser for Crux, generated by pest from the grammar in `crux.pest`.
#[derive(Parser)]
#[grammar = "crux.pest"]
pub struct CruxParser;

impl CruxParser {
    /// Parse a whole source file and return the `program` pair.
    pub fn parse_program(source: &str) -> Result<Pair<'_, Rule>, Box<Error<Rule>>> {
        let mut pairs: Pairs<'_, Rule> = Self::parse(Rule::program, source).map_err(Box::new)?;
        Ok(pairs.next().expect("a successful parse yields a program"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_declarations() {
        assert!(CruxParser::parse_program("int g;").is_ok());
        assert!(CruxParser::parse_program("bool flags[10];").is_ok());
        assert!(CruxParser::parse_program("func void main() { }").is_ok());
    }

    #[test]
    fn parse_statements() {
        let source = "\
func void main() {
    int i;
    i = 0;
    if i < 10 { printInt(i); } else { println(); }
    for (i = 0; i < 5; i = i + 1;) { a[i] = i * i; }
    return;
}";
        assert!(CruxParser::parse_program(source).is_ok());
    }

    #[test]
    fn parse_bare_for_body() {
        let source = "func void main() { int i; for (i = 0; i < 5; i = i + 1;) printInt(i); }";
        assert!(CruxParser::parse_program(source).is_ok());
    }

    #[test]
    fn parse_expressions() {
        let source = "func void main() { bool t; t = !(1 + 2 * 3 >= f(4)) || true && g; }";
        assert!(CruxParser::parse_program(source).is_ok());
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert!(CruxParser::parse_program("int if;").is_err());
        // a keyword prefix is still a valid identifier
        assert!(CruxParser::parse_program("int iffy;").is_ok());
    }

    #[test]
    fn reject_malformed_input() {
        assert!(CruxParser::parse_program("func void main() {").is_err());
        assert!(CruxParser::parse_program("int 1x;").is_err());
        assert!(CruxParser::parse_program("x = 1;").is_err());
    }
}
