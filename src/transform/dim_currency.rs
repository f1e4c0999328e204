use crate::snapshot::{Snapshot, Value};
use eyre::Result;

/// English name for an ISO 4217 code, if it is one we know
pub fn currency_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "USD" => "US Dollar",
        "EUR" => "Euro",
        "JPY" => "Japanese Yen",
        "GBP" => "British Pound",
        "AUD" => "Australian Dollar",
        "CAD" => "Canadian Dollar",
        "CHF" => "Swiss Franc",
        "CNY" => "Chinese Yuan Renminbi",
        "HKD" => "Hong Kong Dollar",
        "NZD" => "New Zealand Dollar",
        "SEK" => "Swedish Krona",
        "KRW" => "South Korean Won",
        "SGD" => "Singapore Dollar",
        "NOK" => "Norwegian Krone",
        "MXN" => "Mexican Peso",
        "INR" => "Indian Rupee",
        "RUB" => "Russian Ruble",
        "ZAR" => "South African Rand",
        "TRY" => "Turkish Lira",
        "BRL" => "Brazilian Real",
        "TWD" => "New Taiwan Dollar",
        "DKK" => "Danish Krone",
        "PLN" => "Polish Zloty",
        "THB" => "Thai Baht",
        "IDR" => "Indonesian Rupiah",
        "HUF" => "Hungarian Forint",
        "CZK" => "Czech Koruna",
        "ILS" => "Israeli New Shekel",
        "CLP" => "Chilean Peso",
        "PHP" => "Philippine Peso",
        "AED" => "United Arab Emirates Dirham",
        "COP" => "Colombian Peso",
        "SAR" => "Saudi Riyal",
        "MYR" => "Malaysian Ringgit",
        "RON" => "Romanian Leu",
        "PEN" => "Peruvian Sol",
        "VND" => "Vietnamese Dong",
        "EGP" => "Egyptian Pound",
        "NGN" => "Nigerian Naira",
        "PKR" => "Pakistani Rupee",
        "BDT" => "Bangladeshi Taka",
        "UAH" => "Ukrainian Hryvnia",
        "KZT" => "Kazakhstani Tenge",
        "QAR" => "Qatari Riyal",
        "KWD" => "Kuwaiti Dinar",
        "OMR" => "Omani Rial",
        "DZD" => "Algerian Dinar",
        "MAD" => "Moroccan Dirham",
        "ARS" => "Argentine Peso",
        "LKR" => "Sri Lankan Rupee",
        _ => return None,
    };
    Some(name)
}

/// `currency_id, currency_code, currency_name`; unknown codes get a NULL name
pub fn transform_dim_currency(currency: &Snapshot) -> Result<Snapshot> {
    let mut dim_currency = currency.select(&["currency_id", "currency_code"])?;
    let names: Vec<Value> = dim_currency
        .rows()
        .iter()
        .map(|row| match &row[1] {
            Value::Text(code) => currency_name(code.trim()).into(),
            _ => Value::Null,
        })
        .collect();

    dim_currency.push_column("currency_name", names)?;
    Ok(dim_currency)
}
