/// A single tag's keyword list, declared in config order. Order is the tie
/// break: when two tags tie on keyword count, the one declared first wins,
/// rather than relying on a hash map's incidental iteration order.
#[derive(Debug, Clone)]
pub struct TagKeywords {
    pub tag: String,
    pub keywords: Vec<String>,
}

impl TagKeywords {
    pub fn new(tag: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            tag: tag.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Pure, deterministic, no-I/O mapping from query text to a topic tag
/// (component C). Instances are cheap to construct and hold only the
/// deploy-time keyword table.
#[derive(Debug, Clone)]
pub struct TagInferencer {
    table: Vec<TagKeywords>,
    fallback_tag: String,
}

impl TagInferencer {
    pub fn new(table: Vec<TagKeywords>, fallback_tag: impl Into<String>) -> Self {
        Self {
            table,
            fallback_tag: fallback_tag.into(),
        }
    }

    /// The six-tag keyword table derived from the legal-domain prototype
    /// this system generalizes from. A concrete, usable default; any
    /// deployment is free to supply its own table instead.
    pub fn default_legal_table() -> Self {
        let table = vec![
            TagKeywords::new(
                "contratos_imobiliarios",
                &["imovel", "aluguel", "locacao", "compra", "venda", "propriedade", "escritura"],
            ),
            TagKeywords::new(
                "litigios_tributarios",
                &["imposto", "tributo", "fiscal", "receita", "icms", "iss", "irpf"],
            ),
            TagKeywords::new(
                "direito_trabalhista",
                &["trabalho", "emprego", "clt", "rescisao", "ferias", "salario", "demissao"],
            ),
            TagKeywords::new(
                "direito_civil",
                &["contrato", "obrigacao", "responsabilidade", "dano", "indenizacao"],
            ),
            TagKeywords::new(
                "direito_penal",
                &["crime", "penal", "processo", "réu", "acusado", "pena"],
            ),
            TagKeywords::new(
                "direito_empresarial",
                &["empresa", "societario", "falencia", "recuperacao", "socio"],
            ),
        ];
        Self::new(table, "direito_civil")
    }

    /// Lowercases and tokenizes on whitespace and common punctuation, then
    /// returns the tag whose keyword list has the most token matches.
    /// Falls back to `fallback_tag` if no tag scores above zero.
    pub fn infer(&self, query: &str) -> String {
        let tokens = tokenize(query);

        let mut best_tag: Option<&str> = None;
        let mut best_count = 0usize;
        for entry in &self.table {
            let count = tokens
                .iter()
                .filter(|t| entry.keywords.iter().any(|k| k == *t))
                .count();
            if count > best_count {
                best_count = count;
                best_tag = Some(entry.tag.as_str());
            }
        }

        match best_tag {
            Some(tag) if best_count > 0 => tag.to_string(),
            _ => self.fallback_tag.clone(),
        }
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_highest_scoring_tag() {
        let inferencer = TagInferencer::default_legal_table();
        assert_eq!(
            inferencer.infer("quero comprar um imovel com escritura"),
            "contratos_imobiliarios"
        );
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let inferencer = TagInferencer::default_legal_table();
        assert_eq!(inferencer.infer("qual a previsao do tempo hoje"), "direito_civil");
    }

    #[test]
    fn ties_break_by_declared_order() {
        let table = vec![
            TagKeywords::new("first", &["x"]),
            TagKeywords::new("second", &["x"]),
        ];
        let inferencer = TagInferencer::new(table, "first");
        assert_eq!(inferencer.infer("x"), "first");
    }

    #[test]
    fn tokenizes_on_punctuation() {
        let inferencer = TagInferencer::default_legal_table();
        assert_eq!(
            inferencer.infer("rescisao, ferias; salario!"),
            "direito_trabalhista"
        );
    }
}
