//! Default rows written on first boot. Existing rows are never touched.

use serde_json::{json, Value};
use sqlx::AnyPool;

use super::{admins, blog, content};
use crate::config::AdminSeed;
use crate::error::AppError;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// How many default rows a seeding pass actually wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub sections: usize,
    pub settings: usize,
    pub categories: usize,
    pub admin_created: bool,
}

fn default_sections() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (
            "hero",
            "Seção Principal",
            json!({
                "title": "Dr. Rodrigo Sguario",
                "subtitle": "Cardiologista Especialista em Transplante Cardíaco",
                "description": "Especialista em cardiologia com foco em transplante cardíaco e insuficiência cardíaca avançada.",
                "cta_text": "Agendar Consulta",
                "cta_link": "#contact",
                "achievements": [
                    {"icon": "Heart", "title": "Referência em Transplante", "description": "Liderança e experiência em transplantes cardíacos"},
                    {"icon": "Award", "title": "Tecnologia Avançada", "description": "Equipamentos de última geração para diagnósticos precisos"},
                    {"icon": "Users", "title": "Atendimento Humanizado", "description": "Cuidado focado no paciente, com empatia e atenção"}
                ],
                "stats": [
                    {"number": "500+", "label": "Pacientes Atendidos"},
                    {"number": "15+", "label": "Anos de Experiência"},
                    {"number": "5.0", "label": "Avaliação Média", "icon": "Star"},
                    {"number": "24h", "label": "Suporte Emergencial"}
                ]
            }),
        ),
        (
            "about",
            "Sobre o Médico",
            json!({
                "title": "Sobre o Dr. Rodrigo",
                "description": "Médico cardiologista com ampla experiência em transplante cardíaco e cuidado humanizado.",
                "education": [
                    {"institution": "Instituto do Coração (InCor) - USP-SP", "degree": "Especialização em Insuficiência Cardíaca e Transplante", "period": "2023-2024"},
                    {"institution": "UNICAMP", "degree": "Residência em Cardiologia", "period": "2021-2023"},
                    {"institution": "Universidade Federal de Pelotas (UFPel)", "degree": "Graduação em Medicina", "period": "2015-2020"}
                ],
                "specialties": [
                    "Transplante Cardíaco",
                    "Insuficiência Cardíaca Avançada",
                    "Cardiologia Preventiva",
                    "Ecocardiografia",
                    "Cateterismo Cardíaco",
                    "Reabilitação Cardíaca"
                ]
            }),
        ),
        (
            "services",
            "Serviços",
            json!({
                "title": "Serviços Oferecidos",
                "description": "Cuidado cardiológico completo e personalizado para cada paciente.",
                "services": [
                    {"id": "transplant", "title": "Transplante Cardíaco", "duration": "60-90 min",
                     "description": "Avaliação completa para transplante cardíaco, acompanhamento pré e pós-operatório."},
                    {"id": "heart_failure", "title": "Insuficiência Cardíaca Avançada", "duration": "45-60 min",
                     "description": "Tratamento especializado para insuficiência cardíaca em estágios avançados."},
                    {"id": "preventive", "title": "Cardiologia Preventiva", "duration": "30-45 min",
                     "description": "Prevenção e diagnóstico precoce de doenças cardiovasculares."},
                    {"id": "echo", "title": "Ecocardiografia", "duration": "30-45 min",
                     "description": "Exame de imagem não invasivo para avaliação detalhada da estrutura e função cardíaca."}
                ]
            }),
        ),
        (
            "contact",
            "Contato",
            json!({
                "title": "Entre em Contato",
                "subtitle": "Agende sua consulta ou tire suas dúvidas. Estamos aqui para cuidar da sua saúde cardíaca",
                "phone": "(11) 3382-1515",
                "email": "rodrigomrsguario.cardiologia@gmail.com",
                "address": {
                    "street": "Av. Paulista, 1048, 18º andar",
                    "district": "Bela Vista, São Paulo - SP",
                    "cep": "CEP: 01310-100"
                },
                "hours": {
                    "weekdays": "Segunda a Sexta: 8h às 18h",
                    "saturday": "Sábado: 8h às 12h",
                    "emergency": "Emergências: 24h"
                }
            }),
        ),
    ]
}

fn default_settings() -> Vec<(&'static str, Value)> {
    vec![
        (
            "social_media",
            json!({
                "whatsapp": {
                    "phone": "5511933821515",
                    "messages": {
                        "general": "Olá! Gostaria de agendar uma consulta com Dr. Rodrigo Sguario.",
                        "transplant": "Olá! Gostaria de agendar uma consulta sobre Transplante Cardíaco com Dr. Rodrigo Sguario.",
                        "heart_failure": "Olá! Gostaria de agendar uma consulta sobre Insuficiência Cardíaca com Dr. Rodrigo Sguario.",
                        "preventive": "Olá! Gostaria de agendar uma consulta de Cardiologia Preventiva com Dr. Rodrigo Sguario.",
                        "echo": "Olá! Gostaria de agendar um Ecocardiograma com Dr. Rodrigo Sguario."
                    }
                }
            }),
        ),
        (
            "site_info",
            json!({
                "title": "Dr. Rodrigo Sguario - Cardiologista",
                "description": "Especialista em cardiologia com foco em transplante cardíaco e insuficiência cardíaca avançada.",
                "keywords": "cardiologista, transplante cardíaco, insuficiência cardíaca, São Paulo"
            }),
        ),
    ]
}

const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Transplante Cardíaco", "Artigos sobre transplante cardíaco", "#EF4444"),
    ("Insuficiência Cardíaca", "Conteúdo sobre insuficiência cardíaca", "#3B82F6"),
    ("Prevenção", "Dicas de prevenção cardiovascular", "#10B981"),
    ("Exames", "Informações sobre exames cardiológicos", "#8B5CF6"),
    ("Tratamentos", "Opções de tratamento", "#F59E0B"),
    ("Estilo de Vida", "Dicas de vida saudável", "#06B6D4"),
];

/// Password hash for the default admin: a configured hash wins, then a
/// configured password, then the built-in default.
fn admin_password_hash(seed: &AdminSeed, bcrypt_cost: u32) -> Result<String, AppError> {
    if let Some(hash) = seed.password_hash.as_deref().filter(|h| !h.is_empty()) {
        return Ok(hash.to_string());
    }
    let plain = seed.password.as_deref().unwrap_or(DEFAULT_ADMIN_PASSWORD);
    bcrypt::hash(plain, bcrypt_cost).map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub async fn seed_defaults(pool: &AnyPool, admin: &AdminSeed, bcrypt_cost: u32) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();

    for (section_id, section_name, data) in default_sections() {
        if content::insert_section_if_missing(pool, section_id, section_name, &data).await? {
            report.sections += 1;
        }
    }

    for (key, value) in default_settings() {
        if content::insert_setting_if_missing(pool, key, &value).await? {
            report.settings += 1;
        }
    }

    for (name, description, color) in DEFAULT_CATEGORIES {
        if blog::insert_category_if_missing(pool, name, description, color).await? {
            report.categories += 1;
        }
    }

    if admins::count(pool).await? == 0 {
        let hash = admin_password_hash(admin, bcrypt_cost)?;
        admins::create(pool, &admin.username, &admin.email, &admin.full_name, &hash).await?;
        report.admin_created = true;
        if admin.password.is_none() && admin.password_hash.is_none() {
            tracing::warn!(
                username = %admin.username,
                "Default admin created with the built-in password; change it after the first login"
            );
        }
    }

    tracing::info!(?report, "Default data seeded");
    Ok(report)
}

#[cfg(test)]
pub(crate) fn test_admin_seed() -> AdminSeed {
    AdminSeed {
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        full_name: "Site Administrator".to_string(),
        password: None,
        password_hash: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::empty_pool;

    #[tokio::test]
    async fn test_seed_writes_defaults_once() {
        let pool = empty_pool().await;

        let first = seed_defaults(&pool, &test_admin_seed(), 4).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                sections: 4,
                settings: 2,
                categories: 6,
                admin_created: true,
            }
        );

        let second = seed_defaults(&pool, &test_admin_seed(), 4).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }

    #[tokio::test]
    async fn test_seed_keeps_edited_content() {
        let pool = empty_pool().await;
        content::put_section(&pool, "hero", Some("Hero"), &json!({"title": "Editado"}))
            .await
            .unwrap();

        let report = seed_defaults(&pool, &test_admin_seed(), 4).await.unwrap();
        assert_eq!(report.sections, 3);

        let hero = content::get_section(&pool, "hero").await.unwrap();
        assert_eq!(hero.content_data, json!({"title": "Editado"}));
    }

    #[tokio::test]
    async fn test_default_admin_password_verifies() {
        let pool = empty_pool().await;
        seed_defaults(&pool, &test_admin_seed(), 4).await.unwrap();

        let admin = admins::find_by_login(&pool, "admin").await.unwrap().unwrap();
        assert!(bcrypt::verify(DEFAULT_ADMIN_PASSWORD, &admin.password_hash).unwrap());
    }

    #[test]
    fn test_configured_hash_is_used_verbatim() {
        let seed = AdminSeed {
            password_hash: Some("$2b$04$precomputed".to_string()),
            ..test_admin_seed()
        };
        assert_eq!(admin_password_hash(&seed, 4).unwrap(), "$2b$04$precomputed");
    }
}
