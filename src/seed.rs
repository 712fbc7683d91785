// src/seed.rs

use crate::{
    models::question::{Difficulty, Question},
    repositories::QuestionStore,
};

struct SampleQuestion {
    subject: &'static str,
    difficulty: Difficulty,
    text: &'static str,
    options: [&'static str; 4],
    correct: usize,
    explanation: &'static str,
}

const SAMPLES: &[SampleQuestion] = &[
    SampleQuestion {
        subject: "Toán học",
        difficulty: Difficulty::Easy,
        text: "2 + 3 = ?",
        options: ["4", "5", "6", "7"],
        correct: 1,
        explanation: "2 + 3 = 5",
    },
    SampleQuestion {
        subject: "Toán học",
        difficulty: Difficulty::Easy,
        text: "10 - 4 = ?",
        options: ["5", "6", "7", "8"],
        correct: 1,
        explanation: "10 - 4 = 6",
    },
    SampleQuestion {
        subject: "Toán học",
        difficulty: Difficulty::Medium,
        text: "Giải phương trình: 2x + 5 = 11",
        options: ["x = 2", "x = 3", "x = 4", "x = 5"],
        correct: 1,
        explanation: "2x + 5 = 11 => 2x = 6 => x = 3",
    },
    SampleQuestion {
        subject: "Toán học",
        difficulty: Difficulty::Medium,
        text: "Tính diện tích hình vuông có cạnh 5cm",
        options: ["20 cm²", "25 cm²", "30 cm²", "35 cm²"],
        correct: 1,
        explanation: "Diện tích hình vuông = cạnh × cạnh = 5 × 5 = 25 cm²",
    },
    SampleQuestion {
        subject: "Toán học",
        difficulty: Difficulty::Hard,
        text: "Tìm đạo hàm của hàm số f(x) = x² + 3x + 2",
        options: ["f'(x) = 2x + 3", "f'(x) = x + 3", "f'(x) = 2x + 2", "f'(x) = x² + 3"],
        correct: 0,
        explanation: "Đạo hàm của x² là 2x, của 3x là 3, của hằng số là 0",
    },
    SampleQuestion {
        subject: "Vật lý",
        difficulty: Difficulty::Easy,
        text: "Đơn vị đo vận tốc trong hệ SI là gì?",
        options: ["km/h", "m/s", "cm/s", "mm/s"],
        correct: 1,
        explanation: "Trong hệ SI, vận tốc đo bằng mét trên giây (m/s)",
    },
    SampleQuestion {
        subject: "Vật lý",
        difficulty: Difficulty::Medium,
        text: "Công thức tính động năng là gì?",
        options: ["Ek = mv", "Ek = ½mv", "Ek = ½mv²", "Ek = mv²"],
        correct: 2,
        explanation: "Động năng được tính bằng Ek = ½mv²",
    },
    SampleQuestion {
        subject: "Vật lý",
        difficulty: Difficulty::Hard,
        text: "Định luật bảo toàn năng lượng phát biểu như thế nào?",
        options: [
            "Năng lượng không thể tạo ra hoặc tiêu hủy",
            "Năng lượng luôn tăng",
            "Năng lượng luôn giảm",
            "Năng lượng không đổi",
        ],
        correct: 0,
        explanation: "Năng lượng chỉ chuyển từ dạng này sang dạng khác",
    },
    SampleQuestion {
        subject: "Hóa học",
        difficulty: Difficulty::Easy,
        text: "Công thức hóa học của nước là gì?",
        options: ["H2O", "HO2", "H2O2", "HO"],
        correct: 0,
        explanation: "Nước có công thức H2O",
    },
    SampleQuestion {
        subject: "Hóa học",
        difficulty: Difficulty::Medium,
        text: "Số proton trong nguyên tử carbon là bao nhiêu?",
        options: ["5", "6", "7", "8"],
        correct: 1,
        explanation: "Carbon có số hiệu nguyên tử 6, tức là có 6 proton",
    },
    SampleQuestion {
        subject: "Sinh học",
        difficulty: Difficulty::Easy,
        text: "Cơ quan nào trong cơ thể người có chức năng bơm máu?",
        options: ["Phổi", "Tim", "Gan", "Thận"],
        correct: 1,
        explanation: "Tim bơm máu đi khắp cơ thể",
    },
    SampleQuestion {
        subject: "Sinh học",
        difficulty: Difficulty::Medium,
        text: "Quá trình quang hợp xảy ra ở đâu trong tế bào thực vật?",
        options: ["Nhân tế bào", "Ty thể", "Lục lạp", "Màng tế bào"],
        correct: 2,
        explanation: "Quang hợp xảy ra trong lục lạp",
    },
];

pub fn sample_questions() -> Vec<Question> {
    SAMPLES
        .iter()
        .map(|s| {
            Question::multiple_choice(
                s.subject,
                s.difficulty,
                s.text,
                s.options.iter().map(|o| o.to_string()).collect(),
                s.correct,
                s.explanation,
            )
            .with_source("sample")
        })
        .collect()
}

/// Loads the bundled sample questions into an empty store. Returns how many
/// were inserted.
pub async fn seed_sample_questions(store: &dyn QuestionStore) -> Result<usize, sqlx::Error> {
    if !store.all_subjects().await?.is_empty() {
        return Ok(0);
    }

    let added = store.insert(&sample_questions()).await? as usize;
    tracing::info!(count = added, "Seeded sample questions");
    Ok(added)
}
