//! Fixed educational answers, preferred over generated text for common questions.

use crate::nlp::normalize::{contains_phrase, prepare};

struct FixedAnswer {
    /// Every group must be present; any phrase inside a group satisfies it.
    requires: &'static [&'static [&'static str]],
    answer: &'static str,
}

const ANSWERS: &[FixedAnswer] = &[
    FixedAnswer {
        requires: &[&["whisky", "whiskey"], &["como"]],
        answer: "O whisky é produzido a partir da fermentação de grãos como cevada, milho ou centeio.\nApós a fermentação, ele é destilado e envelhecido em barris de madeira, processo que define seu sabor, aroma e cor.",
    },
    FixedAnswer {
        requires: &[&["diferenca", "diferencia"], &["whisky", "whiskey"]],
        answer: "As diferenças entre whiskies envolvem o país de origem, o tipo de grão utilizado, o método de destilação e o tempo de envelhecimento.\nIsso resulta em perfis mais suaves ou mais intensos.",
    },
    FixedAnswer {
        requires: &[&["vinho", "vino"], &["como"]],
        answer: "O vinho é feito pela fermentação das uvas.\nO tipo de uva, o clima e o processo de produção influenciam diretamente no aroma, sabor e corpo da bebida.",
    },
    FixedAnswer {
        requires: &[&["diferenca", "diferencia"], &["vinho", "vino"]],
        answer: "Os vinhos variam conforme a uva, o método de produção e o tempo de maturação.\nO resultado são estilos mais leves, frutados ou encorpados.",
    },
    FixedAnswer {
        requires: &[&["espumante", "champagne", "champanhe"]],
        answer: "O espumante é um vinho que passa por uma segunda fermentação, responsável pelas bolhas.\nEle pode variar de seco a doce e costuma ser associado a celebrações.",
    },
    FixedAnswer {
        requires: &[&["gin"]],
        answer: "O gin é um destilado aromatizado principalmente com zimbro e outras especiarias.\nSeu perfil costuma ser fresco e herbal, muito usado em coquetéis.",
    },
    FixedAnswer {
        requires: &[&["cerveja", "cerveza"]],
        answer: "A cerveja é feita a partir de água, malte, lúpulo e fermento.\nExistem diversos estilos, que variam de leves e refrescantes a mais encorpados.",
    },
    FixedAnswer {
        requires: &[&["destilado", "destilados"]],
        answer: "Destilados são bebidas obtidas por destilação após fermentação, como whisky, gin, vodka e rum.\nEsse processo gera bebidas com maior teor alcoólico e sabores mais concentrados.",
    },
    FixedAnswer {
        requires: &[&["sem alcool", "sin alcohol"]],
        answer: "Bebidas sem álcool mantêm sabor e refrescância, mas sem teor alcoólico.\nSão ideais para quem prefere algo leve ou não consome álcool.",
    },
    FixedAnswer {
        requires: &[&["licor", "licores"]],
        answer: "O licor é uma bebida alcoólica adocicada, feita a partir da mistura de álcool com frutas, ervas, sementes ou especiarias.\nO resultado são sabores mais doces e aromáticos.",
    },
];

pub fn fixed_answer(text: &str) -> Option<&'static str> {
    let prepared = prepare(text);
    ANSWERS
        .iter()
        .find(|entry| {
            entry
                .requires
                .iter()
                .all(|group| group.iter().any(|phrase| contains_phrase(&prepared, phrase)))
        })
        .map(|entry| entry.answer)
}

#[cfg(test)]
mod tests {
    use super::fixed_answer;

    #[test]
    fn sparkling_question_gets_the_sparkling_answer() {
        let answer = fixed_answer("o que é um espumante brut?").expect("fixed answer");
        assert!(answer.starts_with("O espumante é um vinho que passa por uma segunda fermentação"));
    }

    #[test]
    fn specific_pairs_win_over_single_topics() {
        let answer = fixed_answer("como é feito o whisky?").expect("fixed answer");
        assert!(answer.starts_with("O whisky é produzido"));

        let answer = fixed_answer("qual a diferença entre os vinhos").expect("fixed answer");
        assert!(answer.starts_with("Os vinhos variam"));
    }

    #[test]
    fn word_boundaries_prevent_false_topics() {
        assert_eq!(fixed_answer("qual a origin disso"), None);
        assert_eq!(fixed_answer("o que é tequila"), None);
    }
}
