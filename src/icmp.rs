use crate::checksum::checksum;
use crate::error::DecodeError;

/// Tamanho fixo do cabeçalho ICMP de echo (RFC 792/4443).
pub const HEADER_LEN: usize = 8;

// Tipos de mensagem usados pelo ping (v4 e v6)
pub const ECHO_REPLY: u8 = 0;
pub const ECHO_REQUEST: u8 = 8;
pub const ECHO_REQUEST_V6: u8 = 128;
pub const ECHO_REPLY_V6: u8 = 129;

/// Mensagem ICMP de echo: cabeçalho de 8 bytes + corpo arbitrário.
///
/// O layout no fio é: type (1), code (1), checksum (2), identifier (2),
/// sequence number (2), todos os campos de 16 bits em ordem de rede.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub msg_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_number: u16,
    pub body: Vec<u8>,
}

impl IcmpMessage {
    /// Monta um Echo Request com o checksum já calculado.
    ///
    /// O tipo vem de quem chama (8 para v4, 128 para v6); o code é sempre 0.
    pub fn echo_request(msg_type: u8, identifier: u16, sequence_number: u16, body: &[u8]) -> Self {
        let mut message = IcmpMessage {
            msg_type,
            code: 0,
            checksum: 0,
            identifier,
            sequence_number,
            body: body.to_vec(),
        };
        // Serializa com o campo de checksum zerado e calcula sobre o todo
        message.checksum = checksum(&message.encode());
        message
    }

    /// Serializa cabeçalho + corpo, pronto para transmissão.
    pub fn encode(&self) -> Vec<u8> {
        let mut pkt = Vec::with_capacity(HEADER_LEN + self.body.len());
        pkt.push(self.msg_type);
        pkt.push(self.code);
        pkt.extend_from_slice(&self.checksum.to_be_bytes());
        pkt.extend_from_slice(&self.identifier.to_be_bytes());
        pkt.extend_from_slice(&self.sequence_number.to_be_bytes());
        pkt.extend_from_slice(&self.body);
        pkt
    }

    /// Decodifica o cabeçalho de 8 bytes; o corpo é o que sobrar do datagrama.
    ///
    /// Identifier e sequence não são validados aqui; isso é papel da sessão.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < HEADER_LEN {
            return Err(DecodeError::TruncatedInput);
        }
        Ok(IcmpMessage {
            msg_type: data[0],
            code: data[1],
            checksum: u16::from_be_bytes([data[2], data[3]]),
            identifier: u16::from_be_bytes([data[4], data[5]]),
            sequence_number: u16::from_be_bytes([data[6], data[7]]),
            body: data[HEADER_LEN..].to_vec(),
        })
    }
}
