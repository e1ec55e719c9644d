use chrono::{DateTime, Utc};
use spg_common::Money;

use crate::MomoApiError;

/// Timestamp format the provider expects in STK push requests.
pub fn stk_timestamp(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d%H%M%S").to_string()
}

/// The STK push password: base64(shortcode + passkey + timestamp).
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64::encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Normalize a subscriber phone number to the international MSISDN form the provider requires
/// (e.g. `254722000001`). Accepts local `07xx`/`01xx` forms, `+254...`, and bare MSISDNs.
pub fn normalize_phone_number(raw: &str) -> Result<String, MomoApiError> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '+' && *c != '-').collect();
    if digits.chars().any(|c| !c.is_ascii_digit()) {
        return Err(MomoApiError::InvalidPhoneNumber(raw.to_string()));
    }
    let msisdn = if digits.len() == 10 && digits.starts_with('0') {
        format!("254{}", &digits[1..])
    } else if digits.len() == 9 && (digits.starts_with('7') || digits.starts_with('1')) {
        format!("254{digits}")
    } else {
        digits
    };
    if msisdn.len() < 10 || msisdn.len() > 14 {
        return Err(MomoApiError::InvalidPhoneNumber(raw.to_string()));
    }
    Ok(msisdn)
}

/// Format an amount the way the provider wants it: whole currency units where the amount is
/// whole, two decimal places otherwise.
pub fn provider_amount(amount: Money) -> String {
    if amount.value() % 100 == 0 {
        (amount.value() / 100).to_string()
    } else {
        amount.to_string()
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamp_format() {
        let t = Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 5).unwrap();
        assert_eq!(stk_timestamp(t), "20240229133005");
    }

    #[test]
    fn password_is_base64_of_concatenation() {
        let pw = stk_password("174379", "passkey", "20240229133005");
        assert_eq!(base64::decode(&pw).unwrap(), b"174379passkey20240229133005");
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone_number("0722000001").unwrap(), "254722000001");
        assert_eq!(normalize_phone_number("722000001").unwrap(), "254722000001");
        assert_eq!(normalize_phone_number("+254 722 000 001").unwrap(), "254722000001");
        assert_eq!(normalize_phone_number("254722000001").unwrap(), "254722000001");
        assert!(normalize_phone_number("not-a-number").is_err());
        assert!(normalize_phone_number("12345").is_err());
    }

    #[test]
    fn amounts_are_whole_units_where_possible() {
        assert_eq!(provider_amount(Money::from_whole(20)), "20");
        assert_eq!(provider_amount(Money::from_cents(2050)), "20.50");
    }
}
