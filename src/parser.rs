//! Parse schema source into AST using PEST.

use crate::ast::*;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Parse schema source into AST.
pub fn parse(source: &str) -> Result<Schema, String> {
    let pairs = SchemaParser::parse(Rule::schema, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_schema(pair)
}

fn build_schema(pair: Pair<'_>) -> Result<Schema, String> {
    let mut tables = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::table {
            tables.push(build_table(inner)?);
        }
    }
    Ok(Schema { tables })
}

fn build_table(pair: Pair<'_>) -> Result<TableSection, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("table: missing name")?.as_str().to_string();
    let fields = it.map(build_field_entry).collect::<Result<Vec<_>, _>>()?;
    Ok(TableSection { name, fields })
}

fn build_field_entry(pair: Pair<'_>) -> Result<FieldEntry, String> {
    let mut it = pair.into_inner();
    let number_pair = it.next().ok_or("field: missing number")?;
    let number = u32::try_from(parse_number(&number_pair)?)
        .map_err(|_| format!("field number {} out of range", number_pair.as_str()))?;
    let type_pair = it.next().ok_or("field: missing type")?;
    let type_spec = match type_pair.as_rule() {
        Rule::preset_type => build_preset(type_pair)?,
        Rule::composed_type => build_composed(type_pair)?,
        _ => return Err(format!("field {}: unexpected type", number)),
    };
    let description = it.next().map(|p| unquote(p.as_str()));
    Ok(FieldEntry { number, type_spec, description })
}

fn build_preset(pair: Pair<'_>) -> Result<FieldTypeSpec, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("preset: missing name")?.as_str().to_string();
    let length = parse_number(&it.next().ok_or("preset: missing length")?)?;
    Ok(FieldTypeSpec::Preset { name, length })
}

fn build_composed(pair: Pair<'_>) -> Result<FieldTypeSpec, String> {
    let mut it = pair.into_inner();
    let kind = match it.next().ok_or("composed: missing kind")?.as_str() {
        "field" => ComposedKind::Field,
        "binary" => ComposedKind::Binary,
        "tagged" => ComposedKind::Tagged,
        "bitmap" => ComposedKind::Bitmap,
        other => return Err(format!("Unknown field kind: {}", other)),
    };
    let length = parse_number(&it.next().ok_or("composed: missing length")?)?;
    let mut options = Vec::new();
    if let Some(block) = it.next() {
        for opt in block.into_inner() {
            options.push(build_option(opt)?);
        }
    }
    Ok(FieldTypeSpec::Composed { kind, length, options })
}

fn build_option(pair: Pair<'_>) -> Result<FieldOption, String> {
    let mut it = pair.into_inner();
    let key = it.next().ok_or("option: missing key")?.as_str().to_string();
    let mut value = it.next().ok_or("option: missing value")?.into_inner();
    let name = value.next().ok_or("option: missing value name")?.as_str().to_string();
    let arg = value.next().map(|p| parse_number(&p)).transpose()?;
    Ok(FieldOption { key, value: OptionValue { name, arg } })
}

fn parse_number(pair: &Pair<'_>) -> Result<u64, String> {
    pair.as_str()
        .parse()
        .map_err(|_| format!("Invalid number: {}", pair.as_str()))
}

fn unquote(s: &str) -> String {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s);
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}
