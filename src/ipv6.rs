use std::net::Ipv6Addr;

use crate::error::DecodeError;

/// Tamanho do cabeçalho fixo IPv6 (RFC 8200).
pub const FIXED_LEN: usize = 40;

/// Cabeçalho fixo IPv6 decodificado de um datagrama.
///
/// Sockets raw ICMPv6 normalmente entregam só a mensagem ICMP, porque o
/// sistema operacional consome o cabeçalho IP. Este decodificador existe
/// para transportes que entregam o cabeçalho; o caminho v6 da sessão não
/// passa por aqui.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Header {
    pub version: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub source_address: Ipv6Addr,
    pub destination_address: Ipv6Addr,
}

impl Ipv6Header {
    /// Decodifica os 40 bytes fixos a partir do início do datagrama.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < FIXED_LEN {
            return Err(DecodeError::TruncatedInput);
        }

        let version = data[0] >> 4;
        if version != 6 {
            return Err(DecodeError::UnsupportedVersion);
        }

        let mut source = [0u8; 16];
        source.copy_from_slice(&data[8..24]);
        let mut destination = [0u8; 16];
        destination.copy_from_slice(&data[24..40]);

        Ok(Ipv6Header {
            version,
            // traffic class: nibble baixo do byte 0 + nibble alto do byte 1
            traffic_class: (data[0] << 4) | (data[1] >> 4),
            flow_label: ((data[1] as u32 & 0x0F) << 16)
                | ((data[2] as u32) << 8)
                | data[3] as u32,
            payload_length: u16::from_be_bytes([data[4], data[5]]),
            next_header: data[6],
            hop_limit: data[7],
            source_address: Ipv6Addr::from(source),
            destination_address: Ipv6Addr::from(destination),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut data = vec![
            0x60, 0x2A, 0xBC, 0xDE, // version=6, tc=0x02, flow=0xABCDE
            0x00, 0x28, // payload length = 40
            0x3A, 0x40, // next header = 58 (ICMPv6), hop limit = 64
        ];
        // origem ::1, destino 2001:db8::1
        let src = Ipv6Addr::LOCALHOST;
        let dst: Ipv6Addr = "2001:db8::1".parse().unwrap();
        data.extend_from_slice(&src.octets());
        data.extend_from_slice(&dst.octets());
        data
    }

    #[test]
    fn test_decode_fields() {
        let hdr = Ipv6Header::decode(&sample_header()).unwrap();
        assert_eq!(hdr.version, 6);
        assert_eq!(hdr.traffic_class, 0x02);
        assert_eq!(hdr.flow_label, 0xABCDE);
        assert_eq!(hdr.payload_length, 40);
        assert_eq!(hdr.next_header, 58);
        assert_eq!(hdr.hop_limit, 64);
        assert_eq!(hdr.source_address, Ipv6Addr::LOCALHOST);
        assert_eq!(hdr.destination_address, "2001:db8::1".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn test_decode_rejects_wrong_version() {
        let mut data = sample_header();
        data[0] = 0x40; // version=4
        assert_eq!(
            Ipv6Header::decode(&data),
            Err(DecodeError::UnsupportedVersion)
        );
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(
            Ipv6Header::decode(&sample_header()[..39]),
            Err(DecodeError::TruncatedInput)
        );
        assert_eq!(Ipv6Header::decode(&[]), Err(DecodeError::TruncatedInput));
    }
}
