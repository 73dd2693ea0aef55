// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::fs;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;

mod catalog;
mod mastery;
mod quiz;
mod recognition;
mod settings;
mod storage;
mod store;
mod word_level;

use catalog::{Catalog, KanaSet};
use mastery::{Domain, KANA_QUIZ_TYPES, KANJI_QUIZ_TYPES};
use quiz::{Feedback, Question, QuizMode};
use recognition::{HttpRecognizer, Ink};
use settings::Settings;
use storage::FileStorage;
use store::ProgressStore;
use word_level::MAX_LEVEL;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

// --------------------------------------------------
// コマンドライン
// --------------------------------------------------

#[derive(Parser)]
#[command(name = "kanawiz", version, about = "KANA WiZ - ひらがな・カタカナ・漢字・単語のクイズ")]
struct Cli {
    /// セーブデータの保存先ディレクトリ
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// クイズを遊ぶ
    Play {
        #[arg(long, value_enum, default_value = "kana")]
        mode: QuizMode,
    },
    /// 進行状況を表示する
    Stats,
    /// 単語パックの一覧
    Shop,
    /// 単語パックを購入する
    Buy {
        pack: String,
        /// 確認せずに購入する
        #[arg(long)]
        yes: bool,
    },
    /// 進行状況をファイルに書き出す
    Export { path: PathBuf },
    /// ファイルから進行状況を読み込む (今の進行状況は置き換えられます)
    Import {
        path: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// 手書き文字を認識して記録する
    Handwrite {
        /// 画の座標を書いた JSON ファイル
        ink: PathBuf,
        /// 書こうとしたかな
        #[arg(long)]
        expect: String,
        #[arg(long, default_value = recognition::DEFAULT_ENDPOINT)]
        endpoint: String,
    },
    /// 出題するかなの文字セットを選ぶ
    Sets {
        #[arg(value_enum, required = true)]
        sets: Vec<KanaSet>,
    },
}

// --------------------------------------------------
// データ構造
// --------------------------------------------------

/// クイズ画面の状態を管理する
struct AppState {
    store: ProgressStore<FileStorage>,
    settings: Settings,
    mode: QuizMode,
    rng: rand::rngs::ThreadRng,

    /// 今の問題 (候補がなければ None)
    question: Option<Question>,
    /// 直前の回答のフィードバック
    last_feedback: Option<Feedback>,
}

impl AppState {
    /// AppState の初期化
    fn new(store: ProgressStore<FileStorage>, settings: Settings, mode: QuizMode) -> Self {
        let mut state = Self {
            store,
            settings,
            mode,
            rng: rand::rng(),
            question: None,
            last_feedback: None,
        };
        state.next_question(); // 最初の問題
        state
    }

    fn next_question(&mut self) {
        self.question = quiz::next_question(&self.store, &self.settings, self.mode, &mut self.rng);
    }

    /// 数字キーでの回答
    fn handle_choice(&mut self, choice: usize) {
        let Some(question) = &self.question else {
            return;
        };
        if choice >= question.choices.len() {
            return; // 選択肢にない数字
        }
        self.last_feedback = Some(quiz::submit(&mut self.store, question, choice));
        self.next_question();
    }

    /// (獲得数, 全体) : ステータスバーのゲージ用
    fn progress_ratio(&self) -> (usize, usize) {
        match self.mode.character_quiz() {
            Some((domain, quiz_type)) => {
                let total = match domain {
                    Domain::Kana => self.store.catalog().kana_in(&self.settings.enabled_sets).len(),
                    Domain::Kanji => self.store.catalog().kanji.len(),
                };
                (self.store.star_count(domain, quiz_type), total)
            }
            None => {
                let state = self.store.state();
                let words = self
                    .store
                    .catalog()
                    .words_with_packs(state.unlocked_packs.iter().map(String::as_str));
                let mastered = words
                    .iter()
                    .filter(|w| self.store.word(w.word).is_mastered())
                    .count();
                (mastered, words.len())
            }
        }
    }
}

// --------------------------------------------------
// メイン関数
// --------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let storage = match cli.data_dir {
        Some(dir) => FileStorage::new(dir),
        None => FileStorage::default_location()?,
    };
    log::debug!("データの保存先: {}", storage.dir().display());

    let command = cli.command.unwrap_or(Commands::Play {
        mode: QuizMode::Kana,
    });

    let settings = Settings::load(&storage);
    let mut store = ProgressStore::load(storage, Catalog::builtin());

    match command {
        Commands::Play { mode } => play(store, settings, mode)?,
        Commands::Stats => print_stats(&store, &settings),
        Commands::Shop => print_shop(&store),
        Commands::Buy { pack, yes } => buy(&mut store, &pack, yes)?,
        Commands::Export { path } => {
            let json = store.export_progress()?;
            fs::write(&path, json).with_context(|| format!("{} に書き込めません", path.display()))?;
            println!("{} に書き出しました", style(path.display()).green());
        }
        Commands::Import { path, yes } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("{} を読み込めません", path.display()))?;
            if !yes && !confirm("今の進行状況を置き換えます。よろしいですか？")? {
                return Ok(());
            }
            store.import_progress(&text)?;
            println!("{} から読み込みました (コイン: {})", path.display(), store.coins());
        }
        Commands::Handwrite {
            ink,
            expect,
            endpoint,
        } => handwrite(&mut store, &ink, &expect, &endpoint)?,
        Commands::Sets { sets } => {
            let settings = Settings { enabled_sets: sets };
            settings.save(store.storage_mut());
            println!("出題する文字セット: {}", format_sets(&settings.enabled_sets));
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn format_sets(sets: &[KanaSet]) -> String {
    sets.iter()
        .map(|s| match s {
            KanaSet::Hiragana => "ひらがな",
            KanaSet::Katakana => "カタカナ",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_stats(store: &ProgressStore<FileStorage>, settings: &Settings) {
    let catalog = store.catalog();
    println!("{} {}", style("コイン:").bold(), style(store.coins()).yellow());
    println!("{} {}", style("文字セット:").bold(), format_sets(&settings.enabled_sets));

    println!("{}", style("かなのスター").bold());
    for quiz_type in KANA_QUIZ_TYPES {
        let earned = store.star_count(Domain::Kana, quiz_type);
        println!("  {quiz_type:<12} ⭐ {earned} / {}", catalog.kana.len());
    }
    println!("{}", style("漢字のスター").bold());
    for quiz_type in KANJI_QUIZ_TYPES {
        let earned = store.star_count(Domain::Kanji, quiz_type);
        println!("  {quiz_type:<12} ⭐ {earned} / {}", catalog.kanji.len());
    }

    println!("{}", style("単語のレベル").bold());
    let mut levels = [0usize; MAX_LEVEL as usize + 1];
    for progress in store.state().word_progress.values() {
        levels[progress.level.min(MAX_LEVEL) as usize] += 1;
    }
    for (level, count) in levels.iter().enumerate() {
        println!("  Lv.{level}: {count}");
    }

    let packs = &store.state().unlocked_packs;
    if !packs.is_empty() {
        println!("{} {}", style("解放済みパック:").bold(), packs.join(", "));
    }
}

fn print_shop(store: &ProgressStore<FileStorage>) {
    println!("{} {}", style("コイン:").bold(), style(store.coins()).yellow());
    for pack in store.catalog().packs {
        let status = if store.is_unlocked(pack.id) {
            style("購入済み".to_string()).green()
        } else {
            style(format!("{}コイン", pack.price)).yellow()
        };
        println!("  {:<8} {} ({}語) {status}", pack.id, pack.name, pack.words.len());
    }
}

fn buy(store: &mut ProgressStore<FileStorage>, pack_id: &str, yes: bool) -> Result<()> {
    let Some(pack) = store.catalog().pack(pack_id) else {
        bail!("パック「{pack_id}」はありません");
    };
    if store.is_unlocked(pack.id) {
        println!("「{}」は購入済みです", pack.name);
        return Ok(());
    }
    if store.coins() < pack.price {
        println!(
            "コインが足りません ({} / {})",
            store.coins(),
            style(pack.price).red()
        );
        return Ok(());
    }
    let prompt = format!("「{}」を {}コインで購入しますか？", pack.name, pack.price);
    if !yes && !confirm(&prompt)? {
        return Ok(());
    }
    if store.purchase_pack(pack.id, pack.price) {
        println!("「{}」を購入しました (残り {}コイン)", pack.name, store.coins());
    }
    Ok(())
}

fn handwrite(
    store: &mut ProgressStore<FileStorage>,
    ink_path: &Path,
    expect: &str,
    endpoint: &str,
) -> Result<()> {
    // 手書きの記録はかなだけ
    if !store.catalog().is_kana(expect) {
        bail!("「{expect}」はかなではありません");
    }
    let text = fs::read_to_string(ink_path)
        .with_context(|| format!("{} を読み込めません", ink_path.display()))?;
    let ink: Ink = serde_json::from_str(&text).context("手書きデータの形式が正しくありません")?;
    let recognizer = HttpRecognizer::new(endpoint)?;

    match recognition::grade(&recognizer, &ink, expect) {
        Ok(correct) => {
            let outcome = store.record_answer(Domain::Kana, expect, "handwriting", correct);
            let feedback = Feedback {
                correct,
                answer: expect.to_string(),
                result: quiz::AnswerResult::Character(outcome),
            };
            println!("{}", feedback.message());
        }
        Err(e) => {
            // 認識に失敗したときは何も記録しない
            log::warn!("手書き認識に失敗しました: {e}");
            println!("{} ({e})", style("認識できませんでした。もう一度書いてください").red());
        }
    }
    Ok(())
}

// --------------------------------------------------
// TUI のセットアップと実行ループ
// --------------------------------------------------

fn play(store: ProgressStore<FileStorage>, settings: Settings, mode: QuizMode) -> Result<()> {
    let mut app_state = AppState::new(store, settings, mode);
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app_state);
    restore_terminal()?;
    result
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Ok(Terminal::new(backend)?)
}

fn restore_terminal() -> Result<()> {
    stdout().execute(Show)?; // カーソルを再表示
    stdout().execute(LeaveAlternateScreen)?; // 代替スクリーンを終了
    disable_raw_mode()?;
    Ok(())
}

fn run_app(terminal: &mut Terminal<impl Backend>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app_state))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Char(c) => {
                            // '1'〜'4' で回答
                            if let Some(n) = c.to_digit(10).filter(|n| *n >= 1) {
                                app_state.handle_choice(n as usize - 1);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui(f: &mut Frame, app_state: &AppState) {
    let size = f.area();
    let title = format!("Kana Wiz ! - {}", app_state.mode.title());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] ステータスバー (コイン, スター)
            Constraint::Length(1), // [1] フィードバック
            Constraint::Length(1), // [2] 空白
            Constraint::Length(1), // [3] 問題
            Constraint::Length(1), // [4] 読みがな
            Constraint::Length(1), // [5] 空白
            Constraint::Min(1),    // [6] 選択肢
        ])
        .split(inner_area);

    // 0. ステータスバー
    let (earned, total) = app_state.progress_ratio();
    let ratio = if total > 0 {
        (earned as f64 / total as f64).min(1.0)
    } else {
        0.0
    };
    let label = format!("🪙 {}  ⭐ {earned} / {total}", app_state.store.coins());
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, chunks[0]);

    // 1. フィードバック
    if let Some(feedback) = &app_state.last_feedback {
        let color = if feedback.correct { Color::Green } else { Color::Red };
        f.render_widget(
            Paragraph::new(feedback.message())
                .style(Style::default().fg(color))
                .centered(),
            chunks[1],
        );
    }

    let Some(question) = &app_state.question else {
        f.render_widget(
            Paragraph::new("出題できる問題がありません (Esc で終了)")
                .style(Style::default().fg(Color::Gray))
                .centered(),
            chunks[3],
        );
        return;
    };

    // 2. 問題
    f.render_widget(
        Paragraph::new(question.prompt.as_str())
            .style(Style::default().fg(Color::White).bold())
            .centered(),
        chunks[3],
    );
    if let Some(hint) = &question.hint {
        f.render_widget(
            Paragraph::new(hint.as_str())
                .style(Style::default().fg(Color::Gray))
                .centered(),
            chunks[4],
        );
    }

    // 3. 選択肢
    let lines: Vec<Line> = question
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| Line::from(format!("[{}] {choice}", i + 1)))
        .collect();
    f.render_widget(Paragraph::new(lines).centered(), chunks[6]);
}
