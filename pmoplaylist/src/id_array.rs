//! Encodage des tableaux d'identifiants OpenHome
//!
//! Un `IdArray` est la concaténation des open_ids (entiers 32 bits
//! big-endian) encodée en base64. `ReadList` reçoit au contraire une liste
//! d'identifiants décimaux séparés par des espaces.

use crate::OpenId;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode une suite d'open_ids en base64
pub fn encode_id_array(ids: &[OpenId]) -> String {
    let bytes: Vec<u8> = ids.iter().flat_map(|id| id.to_be_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Décode un `IdArray` base64
///
/// Les octets en excès (longueur non multiple de 4) sont ignorés.
pub fn decode_id_array(encoded: &str) -> Result<Vec<OpenId>, base64::DecodeError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| OpenId::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Découpe une liste d'identifiants séparés par des blancs
///
/// Un élément non numérique devient 0, identifiant qui ne correspond jamais
/// à une piste : `ReadList` s'arrête alors sur lui.
pub fn parse_id_list(list: &str) -> Vec<OpenId> {
    list.split_whitespace()
        .map(|s| s.parse().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_value() {
        // 1 et 258 : 00 00 00 01 00 00 01 02
        assert_eq!(encode_id_array(&[1, 258]), "AAAAAQAAAQI=");
        assert_eq!(encode_id_array(&[]), "");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_id_array("AAAAAQAAAQI=").unwrap(), vec![1, 258]);
        assert!(decode_id_array("%%%").is_err());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(" 3 7\t12\n"), vec![3, 7, 12]);
        assert_eq!(parse_id_list("4 x 5"), vec![4, 0, 5]);
        assert!(parse_id_list("").is_empty());
    }
}
