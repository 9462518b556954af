//! Default search-query word list for the YouTube flow.
//!
//! Common nouns across a dozen languages so consecutive runs do not hammer
//! the same queries. Runs can replace the list entirely with `--wordlist`.

pub const DEFAULT_WORDS: &[&str] = &[
    // English
    "time", "year", "people", "way", "day", "man", "thing", "woman", "life", "child",
    "world", "school", "state", "family", "student", "group", "country", "problem", "hand", "part",
    // Spanish
    "tiempo", "año", "día", "persona", "hombre", "mujer", "mano", "parte", "país", "lugar",
    "trabajo", "vida", "momento", "forma", "caso", "grupo", "problema", "punto", "gobierno", "empresa",
    // French
    "temps", "homme", "façon", "gens", "vie", "jour", "travail", "appel", "nuit", "maison",
    "pensée", "argent", "nom", "père", "place", "femme", "enfant", "monde", "école",
    // Chinese (Simplified)
    "人", "事", "时间", "朋友", "孩子", "中国", "家", "学生", "问题", "男人",
    "女人", "学校", "工作", "钱", "世界", "书", "生活", "水", "国家", "老师",
    // Japanese
    "子供", "大人", "男", "女", "生活", "友達", "家族", "学生", "先生",
    "社員", "学校", "会社", "駅", "空港", "家", "アパート", "車", "電車", "時間",
    // Hindi
    "नाम", "घर", "समय", "मनुष्य", "पुस्तक", "दिन", "रात", "सप्ताह", "महीना", "साल",
    "शहर", "गांव", "देश", "जल", "अन्न", "आदमी", "बच्चा", "पिता", "माता",
    // Korean
    "사람", "것", "시간", "날", "집", "눈", "생각", "아이", "년", "사랑",
    "친구", "말", "학교", "일", "몸", "마음", "세상", "문제", "엄마", "아빠",
    // Russian
    "человек", "друг", "ребёнок", "женщина", "мужчина", "время", "год", "день", "дело", "рука",
    "глаз", "жизнь", "голова", "дом", "слово", "место", "лицо", "сторона", "нога", "работа",
    // Arabic
    "كتاب", "رجل", "امرأة", "طفل", "عين", "يد", "رأس", "قدم", "سماء",
    "أرض", "بحر", "نار", "شمس", "قمر", "نجم", "بيت", "مدينة", "شارع", "سيارة",
    // German
    "Zeit", "Jahr", "Mensch", "Tag", "Mann", "Frau", "Kind", "Hand", "Auge", "Weg",
    "Freund", "Haus", "Auto", "Arbeit", "Stadt", "Leben", "Problem", "Moment", "Land", "Platz",
    // Portuguese
    "coisa", "tempo", "vida", "dia", "mão", "ano", "olho", "vez", "homem", "parte",
    "mulher", "lugar", "trabalho", "semana", "problema", "ponto", "hora", "pessoa", "forma", "caso",
    // Italian
    "anno", "giorno", "uomo", "volta", "vita", "mano", "occhio", "donna", "casa", "mondo",
    "tempo", "modo", "parte", "amico", "persona", "problema", "notte", "punto", "cuore", "padre",
];

pub fn default_words() -> Vec<String> {
    DEFAULT_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Load a replacement word list: one word per line, blanks ignored.
pub async fn load_words(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let words: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    anyhow::ensure!(!words.is_empty(), "word list {} is empty", path.display());
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_is_nonempty_and_deduplicatable() {
        let words = default_words();
        assert!(words.len() > 100);
        assert!(words.iter().all(|w| !w.trim().is_empty()));
    }
}
