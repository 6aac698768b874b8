//! Prompt templates. Each one states the context, the pre-computed mean
//! sentiment for cross-reference, then the delimited record block.

pub fn daily(date: &str, sentiment: f64, block: &str) -> String {
    format!(
        r#"You are a senior business and market analyst. Using only the news below from {date}, write a detailed daily digest of markets, business and startups.

Mean sentiment of the collected headlines: {sentiment:.2} (-1 = very negative, 0 = neutral, +1 = very positive).

Structure the digest with these sections:

1. MARKET OVERVIEW: 3-5 sentences on the major index moves (S&P 500, Dow, NASDAQ), global cues and investor mood.
2. BUSINESS & STARTUP HIGHLIGHTS: 5-7 bullet points on funding rounds, M&A, IPOs, launches or regulation.
3. SECTOR WATCH: performance across Tech, Consumer, Finance, Energy and other sectors, with emerging shifts.
4. PRODUCTS & TECH TRENDS: launches or technologies that gained traction today.
5. KEY COMPANY MOVES: earnings, leadership changes, controversies or expansions.
6. MACRO & POLICY: economic data, central bank remarks, government action or global events that moved sentiment.
7. SENTIMENT SNAPSHOT: the tone of the day, and whether it agrees with the mean sentiment above.
8. WHAT TO WATCH TOMORROW: scheduled earnings, announcements or events.

Keep it concise and relevant.

--- NEWS FOR {date} ---
{block}
--- END NEWS ---

DAILY MARKET DIGEST - {date}:
"#
    )
}

pub fn topic(query: &str, sentiment: f64, block: &str) -> String {
    format!(
        r#"You are a financial analyst covering companies and sectors. Analyze the recent news about "{query}" below.

Mean sentiment of the collected articles: {sentiment:.2} (-1 = very negative, 0 = neutral, +1 = very positive).

Provide:

1. EXECUTIVE SUMMARY: 3-4 sentences on the key developments for "{query}".
2. SENTIMENT: positive, negative or mixed, with the reasons.
3. KEY DEVELOPMENTS: bullet points of the major events and announcements.
4. FINANCIAL IMPACT: earnings, revenue or market effects mentioned.
5. MARKET IMPLICATIONS: possible effect on the stock, its sector or the wider market.
6. RELATED ENTITIES: competitors, partners or sectors mentioned alongside "{query}".
7. INVESTOR TAKEAWAYS: opportunities and risks raised in the articles.

Stay objective and stick to facts in the articles.

--- ARTICLES ABOUT "{query}" ---
{block}
--- END ARTICLES ---

ANALYSIS FOR "{query}":
"#
    )
}

pub fn discussion(query: &str, period: &str, sentiment: f64, block: &str) -> String {
    format!(
        r#"You are a financial analyst who interprets online investor discussions. Below are snippets of community posts about "{query}" gathered {period}. Each snippet has a title, community, date, score, comment count, content preview and a sentiment score (-1 very negative, +1 very positive).

Using only these snippets:

1. Overall Sentiment: is the dominant mood positive, negative or mixed? Say whether the mean sentiment of {sentiment:.2} matches your reading of the text.
2. Key Themes: the 2-3 most discussed themes, worries or news items.
3. Community Focus: which kinds of communities carry the discussion, naming 1-2 prominent ones.
4. Notable Contrasts: disagreements or recurring debates.
5. Emerging Trends: recent shifts in topic or tone, if visible.

Answer in 3-5 concise paragraphs. Do not add outside information or opinions.

--- BEGIN DISCUSSION SNIPPETS ---
{block}
--- END DISCUSSION SNIPPETS ---

Discussion analysis for "{query}":
"#
    )
}

#[cfg(test)]
mod tests {
    #[test]
    fn templates_embed_block_and_sentiment() {
        let p = super::topic("Tesla", 0.1234, "Title: X");
        assert!(p.contains("0.12"));
        assert!(p.contains("Title: X"));
        assert!(p.contains("ANALYSIS FOR \"Tesla\""));

        let d = super::discussion("AAPL", "since 2024-03-01", -0.5, "B");
        assert!(d.contains("gathered since 2024-03-01"));
        assert!(d.contains("-0.50"));
    }
}
