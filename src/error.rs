use thiserror::Error;

/// Erros de decodificação de datagramas recebidos.
///
/// Nunca são fatais: o datagrama é descartado e a recepção continua.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("entrada truncada")]
    TruncatedInput,
    #[error("cabeçalho malformado")]
    MalformedHeader,
    #[error("versão de IP não suportada")]
    UnsupportedVersion,
}
