//! Pipeline rule configuration.
//!
//! `PipelineConfig::default()` is the built-in rule set. A JSON file may
//! override any section; missing sections keep the built-in values.
//!
//! Order matters in several lists: alias keys are tried first to last,
//! and the urgency bonus table is matched first to last.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    pub sentiment: SentimentLexicon,
    pub urgency: UrgencyConfig,
    pub keywords: KeywordConfig,
    pub branches: BranchConfig,
    /// Category reported when no keyword matches.
    pub default_category: String,
    pub insights: InsightConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub name_keys: Vec<String>,
    pub phone_keys: Vec<String>,
    pub text_keys: Vec<String>,
    pub branch_keys: Vec<String>,
    pub timestamp_keys: Vec<String>,
    /// Stored in place of an empty or missing description.
    pub text_sentinel: String,
    /// Maximum length, in characters, of name and text fields.
    pub max_field_chars: usize,
    /// Prefixes stripped from 12-digit phone numbers.
    pub country_codes: Vec<String>,
    pub placeholder_phones: Vec<String>,
    pub url_markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentLexicon {
    pub negative: Vec<String>,
    pub positive: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBonus {
    pub category: String,
    pub bonus: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyConfig {
    pub category_bonuses: Vec<CategoryBonus>,
    /// Any of these in the text forces maximum urgency.
    pub emergency_keywords: Vec<String>,
    /// Complaints at or above this urgency emit an insight.
    pub insight_threshold: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub stop_words: Vec<String>,
    pub min_token_chars: usize,
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
    pub candidate_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightPlaybook {
    pub category: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub playbooks: Vec<InsightPlaybook>,
    pub default_actions: Vec<String>,
    /// Prepended to the actions when an emergency keyword fired.
    pub emergency_action: String,
}

impl PipelineConfig {
    /// Load overrides from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid pipeline config {path}: {e}"))?;
        Ok(config)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            sentiment: SentimentLexicon::default(),
            urgency: UrgencyConfig::default(),
            keywords: KeywordConfig::default(),
            branches: BranchConfig::default(),
            default_category: "Satisfacción general".into(),
            insights: InsightConfig::default(),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            name_keys: strings(&[
                "nombre", "nombre_cliente", "nombre completo", "cliente", "name", "customer_name",
            ]),
            phone_keys: strings(&["telefono", "celular", "whatsapp", "tel", "phone"]),
            text_keys: strings(&[
                "descripcion", "queja", "comentario", "comentarios", "mensaje", "description", "text",
            ]),
            branch_keys: strings(&[
                "sucursal", "ubicacion", "tienda", "restaurante", "branch", "location",
            ]),
            timestamp_keys: strings(&[
                "fecha", "marca temporal", "fecha_hora", "timestamp", "created_at",
            ]),
            text_sentinel: "Sin descripción".into(),
            max_field_chars: 1000,
            country_codes: strings(&["52"]),
            placeholder_phones: strings(&[
                "0000000000", "1111111111", "1234567890", "5555555555", "9999999999",
            ]),
            url_markers: strings(&["http", "www.", "://", ".com"]),
        }
    }
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            negative: strings(&[
                "horrible", "pésimo", "pésima", "pesimo", "malo", "mala", "terrible",
                "asqueroso", "asco", "sucio", "sucia", "grosero", "grosera", "lento",
                "crudo", "quemado", "peor", "decepción", "molesto", "desagradable",
            ]),
            positive: strings(&[
                "bueno", "buena", "excelente", "delicioso", "deliciosa", "amable",
                "rápido", "limpio", "gracias", "mejor", "feliz", "encantó", "perfecto",
            ]),
        }
    }
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            category_bonuses: vec![
                CategoryBonus { category: "Higiene".into(), bonus: 2 },
                CategoryBonus { category: "Calidad del producto".into(), bonus: 1 },
                CategoryBonus { category: "Atención del personal".into(), bonus: 1 },
            ],
            emergency_keywords: strings(&[
                "intoxicación", "intoxicacion", "intoxicado", "intoxicada", "envenenamiento",
                "hospital", "urgencias", "ambulancia", "reacción alérgica", "desmayo",
            ]),
            insight_threshold: 4,
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            stop_words: strings(&[
                "para", "pero", "como", "esta", "este", "esto", "estaba", "estaban", "estuvo",
                "fueron", "porque", "cuando", "donde", "mucho", "mucha", "todo", "toda",
                "todos", "nada", "sobre", "entre", "también", "desde", "hasta", "hace",
                "sido", "tiene", "tenía", "ellos", "ellas", "nosotros", "usted", "ustedes",
                "ante", "bien", "solo", "sólo", "otra", "otro", "aunque", "cual", "quien",
                "mismo", "misma", "algo", "sucursal", "restaurante", "that", "this", "with",
            ]),
            min_token_chars: 4,
            top_n: 5,
        }
    }
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self { candidate_limit: 3 }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            playbooks: vec![
                InsightPlaybook {
                    category: "Higiene".into(),
                    actions: strings(&[
                        "Programar inspección sanitaria en la sucursal",
                        "Revisar bitácoras de limpieza del turno",
                    ]),
                },
                InsightPlaybook {
                    category: "Calidad del producto".into(),
                    actions: strings(&[
                        "Verificar temperaturas y tiempos de cocción",
                        "Revisar el lote de insumos con el gerente",
                    ]),
                },
                InsightPlaybook {
                    category: "Atención del personal".into(),
                    actions: strings(&[
                        "Entrevistar al personal del turno",
                        "Reforzar la capacitación de servicio",
                    ]),
                },
            ],
            default_actions: strings(&[
                "Contactar al cliente para seguimiento",
                "Notificar al gerente de la sucursal",
            ]),
            emergency_action: "Contactar al cliente de inmediato y escalar a dirección regional"
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_builtin_sections() {
        let json = r#"{ "branches": { "candidate_limit": 5 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.branches.candidate_limit, 5);
        assert_eq!(config.keywords.top_n, 5);
        assert_eq!(config.urgency.insight_threshold, 4);
        assert!(!config.sentiment.negative.is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = PipelineConfig::load("/nonexistent/pipeline.json").unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}
