use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sig-review")]
#[command(about = "Signature verification review console", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 照合サービスのURL（設定ファイルより優先）
    #[arg(long, global = true)]
    pub server_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 文書を開いて対話的にレビュー
    Review {
        /// 文書のファイル名（サーバ側の名前）
        #[arg(required = true)]
        filename: String,
    },

    /// 署名を抽出してJSONで出力
    Extract {
        #[arg(required = true)]
        filename: String,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 1行分の照合候補を表示
    Lookup {
        #[arg(required = true)]
        filename: String,

        /// 署名行番号
        #[arg(short, long)]
        line: String,
    },

    /// 設定を表示/編集
    Config {
        /// 照合サービスのURLを設定
        #[arg(long)]
        set_server_url: Option<String>,

        /// タイムアウト秒数を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// オペレータ名を設定
        #[arg(long)]
        set_operator: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
