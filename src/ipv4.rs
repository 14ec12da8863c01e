use std::net::Ipv4Addr;

use crate::error::DecodeError;

/// Tamanho do prefixo fixo do cabeçalho IPv4 (RFC 791).
pub const FIXED_LEN: usize = 20;

/// Cabeçalho IPv4 decodificado de um datagrama de resposta.
///
/// Somente leitura: o cliente nunca monta cabeçalhos IP, o kernel faz isso.
/// As opções (0 a 40 bytes) são puladas, não interpretadas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub header_length_words: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_and_offset: u16,
    pub time_to_live: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
}

impl Ipv4Header {
    /// Comprimento total do cabeçalho em bytes (prefixo fixo + opções).
    pub fn header_length(&self) -> usize {
        self.header_length_words as usize * 4
    }

    /// Decodifica o cabeçalho a partir do início do datagrama.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < FIXED_LEN {
            return Err(DecodeError::TruncatedInput);
        }

        let version = data[0] >> 4;
        if version != 4 {
            return Err(DecodeError::UnsupportedVersion);
        }

        let header_length_words = data[0] & 0x0F;
        let header_length = header_length_words as usize * 4;
        // Opções fora de 0..=40 bytes indicam um IHL inválido
        if header_length < FIXED_LEN || header_length - FIXED_LEN > 40 {
            return Err(DecodeError::MalformedHeader);
        }
        if data.len() < header_length {
            return Err(DecodeError::TruncatedInput);
        }

        Ok(Ipv4Header {
            version,
            header_length_words,
            type_of_service: data[1],
            total_length: u16::from_be_bytes([data[2], data[3]]),
            identification: u16::from_be_bytes([data[4], data[5]]),
            flags_and_offset: u16::from_be_bytes([data[6], data[7]]),
            time_to_live: data[8],
            protocol: data[9],
            header_checksum: u16::from_be_bytes([data[10], data[11]]),
            source_address: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination_address: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
        })
    }
}
