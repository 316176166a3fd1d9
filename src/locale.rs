/// A storefront: country code, site hostname and currency formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub code: &'static str,
    pub domain: &'static str,
    pub currency_sign: &'static str,
    pub currency_code: &'static str,
}

pub const DEFAULT_COUNTRY: &str = "US";

const LOCALES: &[Locale] = &[
    Locale { code: "AE", domain: "www.amazon.ae", currency_sign: "AED ", currency_code: "AED" },
    Locale { code: "AU", domain: "www.amazon.com.au", currency_sign: "$", currency_code: "AUD" },
    Locale { code: "BR", domain: "www.amazon.com.br", currency_sign: "R$", currency_code: "BRL" },
    Locale { code: "CA", domain: "www.amazon.ca", currency_sign: "$", currency_code: "CAD" },
    Locale { code: "DE", domain: "www.amazon.de", currency_sign: "€", currency_code: "EUR" },
    Locale { code: "ES", domain: "www.amazon.es", currency_sign: "€", currency_code: "EUR" },
    Locale { code: "FR", domain: "www.amazon.fr", currency_sign: "€", currency_code: "EUR" },
    Locale { code: "IN", domain: "www.amazon.in", currency_sign: "₹", currency_code: "INR" },
    Locale { code: "IT", domain: "www.amazon.it", currency_sign: "€", currency_code: "EUR" },
    Locale { code: "JP", domain: "www.amazon.co.jp", currency_sign: "¥", currency_code: "JPY" },
    Locale { code: "MX", domain: "www.amazon.com.mx", currency_sign: "$", currency_code: "MXN" },
    Locale { code: "NL", domain: "www.amazon.nl", currency_sign: "€", currency_code: "EUR" },
    Locale { code: "SG", domain: "www.amazon.sg", currency_sign: "S$", currency_code: "SGD" },
    Locale { code: "TR", domain: "www.amazon.com.tr", currency_sign: "TL ", currency_code: "TRY" },
    Locale { code: "UK", domain: "www.amazon.co.uk", currency_sign: "£", currency_code: "GBP" },
    Locale { code: "US", domain: "www.amazon.com", currency_sign: "$", currency_code: "USD" },
];

impl Locale {
    /// Look up an uppercase two-letter code.
    pub fn find(code: &str) -> Option<&'static Locale> {
        LOCALES.iter().find(|locale| locale.code == code)
    }

    pub fn default_locale() -> &'static Locale {
        // The table always carries the default entry.
        Self::find(DEFAULT_COUNTRY).unwrap_or(&LOCALES[LOCALES.len() - 1])
    }

    #[cfg(test)]
    pub fn all() -> &'static [Locale] {
        LOCALES
    }

    pub fn site_root(&self) -> String {
        format!("https://{}", self.domain)
    }
}
