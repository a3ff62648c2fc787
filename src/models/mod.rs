use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of label types accepted for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    Qr,
    Barcode,
    Shipping,
}

impl LabelType {
    pub const ALL: [LabelType; 3] = [LabelType::Qr, LabelType::Barcode, LabelType::Shipping];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelType::Qr => "qr",
            LabelType::Barcode => "barcode",
            LabelType::Shipping => "shipping",
        }
    }
}

impl std::str::FromStr for LabelType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qr" => Ok(LabelType::Qr),
            "barcode" => Ok(LabelType::Barcode),
            "shipping" => Ok(LabelType::Shipping),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LabelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of role names. Roles are seeded by migration and have no CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleName {
    Administrador,
    Supervisor,
    Operador,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Administrador => "Administrador",
            RoleName::Supervisor => "Supervisor",
            RoleName::Operador => "Operador",
        }
    }
}

impl std::str::FromStr for RoleName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Administrador" => Ok(RoleName::Administrador),
            "Supervisor" => Ok(RoleName::Supervisor),
            "Operador" => Ok(RoleName::Operador),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry as exposed by the articles API.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Articulo {
    pub id: i32,
    pub sku: String,
    pub descripcion: String,
    pub categoria: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub tipo_etiqueta: String,
    pub codigo_barras: Option<String>,
    pub imagen_url: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row as exposed by the users API (never carries the password hash).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Usuario {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub rol_id: i32,
    pub activo: bool,
    pub ultimo_acceso: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User joined with its role, loaded for credential checks.
#[derive(Debug, Clone, FromRow)]
pub struct UsuarioConRol {
    pub id: i32,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub nombre: String,
    pub apellido: String,
    pub rol_id: i32,
    pub rol_nombre: String,
    pub activo: bool,
}

/// Normalized profile returned by login, perfil and verificar-token.
#[derive(Debug, Clone, Serialize)]
pub struct Perfil {
    pub id: i32,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    #[serde(rename = "nombreCompleto")]
    pub nombre_completo: String,
    pub rol: RoleName,
    #[serde(rename = "rolId")]
    pub rol_id: i32,
    #[serde(rename = "ultimoAcceso", skip_serializing_if = "Option::is_none")]
    pub ultimo_acceso: Option<DateTime<Utc>>,
    #[serde(rename = "creadoEn", skip_serializing_if = "Option::is_none")]
    pub creado_en: Option<DateTime<Utc>>,
}
