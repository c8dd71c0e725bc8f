//! Customer-facing wording for catalog answers.

use rust_decimal::{Decimal, RoundingStrategy};

use sommelier_core::domain::product::ProductSummary;

pub const NO_RESULTS: &str = "Não encontrei nenhuma bebida com essas características 😕\n\nVocê pode tentar outra marca, tipo de bebida ou faixa de preço.";
pub const REFINE_PROMPT: &str = "Quer refinar por marca, tipo, preço ou volume?";

const LIST_INTROS: &[&str] = &[
    "Encontrei algumas opções que combinam com o que você procura 🍷",
    "Separei algumas boas opções para você 🍇",
    "Esses rótulos podem ser uma ótima escolha 🍷",
];

const ACRONYMS: &[&str] = &[
    "ML", "LT", "L", "CL", "XO", "VS", "VSOP", "V.S.O.P", "V.S.", "IPA", "APA", "DOC", "IGT",
    "AGED", "RESERVA", "GRAN", "GRAND", "BRUT", "SEC", "DEMI", "DEMI-SEC", "SINGLE", "MALT",
];

const FIXED_WORDS: &[(&str, &str)] = &[
    ("whisky", "Whisky"),
    ("whiskey", "Whiskey"),
    ("vino", "Vino"),
    ("vinho", "Vinho"),
    ("champagne", "Champagne"),
    ("espumante", "Espumante"),
    ("cachaca", "Cachaça"),
    ("cachaça", "Cachaça"),
    ("anos", "Anos"),
];

/// Title-cases a product name while keeping label acronyms and numbers intact.
pub fn format_name(name: &str) -> String {
    name.split_whitespace().map(format_word).collect::<Vec<_>>().join(" ")
}

fn format_word(word: &str) -> String {
    if is_number(word) {
        return word.to_string();
    }

    let upper = word.to_uppercase();
    if ACRONYMS.contains(&upper.as_str()) {
        return upper;
    }

    let lower = word.to_lowercase();
    if let Some((_, fixed)) = FIXED_WORDS.iter().find(|(key, _)| *key == lower) {
        return (*fixed).to_string();
    }

    title_case(&lower)
}

fn is_number(word: &str) -> bool {
    word.chars().any(|ch| ch.is_ascii_digit())
        && word.chars().all(|ch| ch.is_ascii_digit() || ch == '.' || ch == ',')
}

/// Uppercases the first letter of every alphanumeric run, like `Jack Daniel's` or `Demi-Sec`.
fn title_case(lower: &str) -> String {
    let mut out = String::with_capacity(lower.len());
    let mut at_start = true;
    for ch in lower.chars() {
        if at_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_start = !(ch.is_alphanumeric() || ch == '\'');
    }
    out
}

/// `1234.5` becomes `1.234,50`.
pub fn format_price(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = whole.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped},{cents}")
}

pub fn category_emoji(category: &str) -> &'static str {
    let upper = category.to_uppercase();
    let has = |needle: &str| upper.contains(needle);
    if has("VIN") {
        "🍷"
    } else if has("WHI") {
        "🥃"
    } else if has("CERV") {
        "🍺"
    } else if has("ESPUM") || has("CHAMP") {
        "🍾"
    } else if has("LICOR") || has("VODKA") || has("GIN") {
        "🍸"
    } else if has("RUM") || has("RON") || has("TEQUILA") {
        "🥃"
    } else {
        "🍹"
    }
}

/// Picks an intro from the message text so a given question always reads the same.
fn list_intro(seed: &str) -> &'static str {
    let hash = seed.bytes().fold(0usize, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as usize));
    LIST_INTROS[hash % LIST_INTROS.len()]
}

pub fn product_line(product: &ProductSummary) -> String {
    format!(
        "👉 {} {} - {} dólares",
        category_emoji(&product.category),
        format_name(&product.display_name),
        format_price(product.price)
    )
}

pub fn product_list(products: &[ProductSummary], seed: &str) -> String {
    if products.is_empty() {
        return NO_RESULTS.to_string();
    }

    let lines = products.iter().map(product_line).collect::<Vec<_>>().join("\n");
    format!("{}\n\n{lines}\n\n{REFINE_PROMPT}", list_intro(seed))
}

pub fn single_price(name: &str, price: Decimal) -> String {
    format!("O {} custa {} dólares.", format_name(name), format_price(price))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sommelier_core::domain::product::{ProductId, ProductSummary};

    use super::{category_emoji, format_name, format_price, product_list, NO_RESULTS, REFINE_PROMPT};

    #[test]
    fn names_keep_acronyms_and_numbers() {
        assert_eq!(format_name("GLENFIDDICH 18 anos single malt"), "Glenfiddich 18 Anos SINGLE MALT");
        assert_eq!(format_name("chandon  demi-sec 750 ml"), "Chandon DEMI-SEC 750 ML");
        assert_eq!(format_name("jack daniel's old no. 7"), "Jack Daniel's Old No. 7");
        assert_eq!(format_name("cachaca ypioca"), "Cachaça Ypioca");
        assert_eq!(format_name("   "), "");
    }

    #[test]
    fn prices_use_dot_thousands_and_comma_decimals() {
        assert_eq!(format_price(Decimal::new(123456, 2)), "1.234,56");
        assert_eq!(format_price(Decimal::from(25)), "25,00");
        assert_eq!(format_price(Decimal::new(1_250_000_505, 3)), "1.250.000,51");
        assert_eq!(format_price(Decimal::new(99, 2)), "0,99");
    }

    #[test]
    fn emoji_follows_category_family() {
        assert_eq!(category_emoji("VINOS"), "🍷");
        assert_eq!(category_emoji("ESPUMANTES"), "🍾");
        assert_eq!(category_emoji("RON"), "🥃");
        assert_eq!(category_emoji("GIN"), "🍸");
        assert_eq!(category_emoji("AGUA"), "🍹");
    }

    #[test]
    fn list_has_intro_lines_and_refine_prompt() {
        let products = vec![ProductSummary {
            id: ProductId(1),
            display_name: "trapiche malbec".to_string(),
            category: "VINOS".to_string(),
            price: Decimal::new(980, 2),
        }];

        let reply = product_list(&products, "vinho suave");
        assert!(reply.contains("👉 🍷 Trapiche Malbec - 9,80 dólares"));
        assert!(reply.ends_with(REFINE_PROMPT));
        assert_eq!(reply, product_list(&products, "vinho suave"));
        assert_eq!(product_list(&[], "vinho suave"), NO_RESULTS);
    }
}
