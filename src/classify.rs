use crate::model::TableKind;

pub const FINANCIAL_KEYWORDS: &[&str] = &["valor", "preço", "custo", "total", "r$", "reais", "saldo"];
pub const DATE_TABLE_KEYWORDS: &[&str] = &["data", "período", "mês", "ano", "dia"];
pub const PERSON_KEYWORDS: &[&str] = &["nome", "pessoa", "cliente", "funcionário", "cpf", "cnpj"];

fn keyword_score(columns: &[String], keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| columns.iter().any(|column| column.contains(*keyword)))
        .count()
}

/// Labels a table by subject from its column names. Only a strictly highest
/// score wins; ties resolve to [`TableKind::General`].
#[must_use]
pub fn classify_table<S: AsRef<str>>(columns: &[S]) -> TableKind {
    let lowered = columns
        .iter()
        .map(|column| column.as_ref().to_lowercase())
        .collect::<Vec<_>>();

    let financial = keyword_score(&lowered, FINANCIAL_KEYWORDS);
    let date = keyword_score(&lowered, DATE_TABLE_KEYWORDS);
    let person = keyword_score(&lowered, PERSON_KEYWORDS);

    if financial > date.max(person) {
        TableKind::Financial
    } else if date > financial.max(person) {
        TableKind::Date
    } else if person > financial.max(date) {
        TableKind::Person
    } else {
        TableKind::General
    }
}
