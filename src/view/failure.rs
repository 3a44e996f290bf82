use serde::Serialize;

use crate::backend::ApiError;
use crate::employee::FieldError;

const NETWORK_MESSAGE: &str =
    "Não foi possível conectar ao servidor. Verifique a conexão e tente novamente.";
const DECODE_MESSAGE: &str = "Resposta inesperada do servidor. Tente novamente mais tarde.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Network,
    Server,
    Decode,
}

/// What the view shows for a failed operation. Never the raw transport error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Only connectivity problems offer a retry.
    pub retryable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl From<&ApiError> for Failure {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Validation(errors) => Self {
                kind: FailureKind::Validation,
                message: format!(
                    "Por favor, preencha todos os campos corretamente ({} campo(s) inválido(s)).",
                    errors.len()
                ),
                retryable: false,
                fields: errors.errors().to_vec(),
            },
            ApiError::Network(_) => Self {
                kind: FailureKind::Network,
                message: NETWORK_MESSAGE.to_string(),
                retryable: true,
                fields: Vec::new(),
            },
            ApiError::Server { message, .. } => Self {
                kind: FailureKind::Server,
                message: message.clone(),
                retryable: false,
                fields: Vec::new(),
            },
            ApiError::Decode { .. } => Self {
                kind: FailureKind::Decode,
                message: DECODE_MESSAGE.to_string(),
                retryable: false,
                fields: Vec::new(),
            },
        }
    }
}
