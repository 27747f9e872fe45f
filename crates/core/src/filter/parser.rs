use super::expr::{Atom, FilterExpr, FilterField};
use super::FilterError;

/// Parse a filter expression.
///
/// Whitespace around operators and atoms is ignored. Values are taken
/// verbatim up to the next operator.
pub fn parse_filter(input: &str) -> Result<FilterExpr, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::Empty);
    }

    let mut offset = 0;
    let mut result: Option<FilterExpr> = None;

    for branch in input.split(',') {
        let conjunction = parse_and(branch, offset)?;
        offset += branch.len() + 1;
        result = Some(match result {
            None => conjunction,
            Some(lhs) => FilterExpr::Or(Box::new(lhs), Box::new(conjunction)),
        });
    }

    result.ok_or(FilterError::Empty)
}

fn parse_and(input: &str, start: usize) -> Result<FilterExpr, FilterError> {
    let mut offset = start;
    let mut result: Option<FilterExpr> = None;

    for operand in input.split('+') {
        let unary = parse_unary(operand, offset)?;
        offset += operand.len() + 1;
        result = Some(match result {
            None => unary,
            Some(lhs) => FilterExpr::And(Box::new(lhs), Box::new(unary)),
        });
    }

    result.ok_or(FilterError::EmptyOperand(start))
}

fn parse_unary(input: &str, position: usize) -> Result<FilterExpr, FilterError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FilterError::EmptyOperand(position));
    }

    match trimmed.strip_prefix('!') {
        Some(rest) if rest.trim().is_empty() => Err(FilterError::EmptyOperand(position)),
        Some(rest) => Ok(FilterExpr::Not(parse_atom(rest.trim())?)),
        None => Ok(FilterExpr::Atom(parse_atom(trimmed)?)),
    }
}

fn parse_atom(input: &str) -> Result<Atom, FilterError> {
    let (field, value) = input
        .split_once(':')
        .ok_or_else(|| FilterError::MalformedAtom(input.to_string()))?;
    let (field, value) = (field.trim(), value.trim());

    if field.is_empty() || value.is_empty() {
        return Err(FilterError::MalformedAtom(input.to_string()));
    }

    let field = FilterField::parse(&field.to_ascii_lowercase())
        .ok_or_else(|| FilterError::UnknownField(field.to_string()))?;

    Ok(Atom::new(field, value))
}
