//! Fixed instruction sent alongside every chart screenshot.

pub const MAX_TOKENS: u32 = 1000;

/// Low temperature keeps repeated analyses of the same chart consistent.
pub const TEMPERATURE: f64 = 0.3;

pub const ANALYST_PROMPT: &str = r#"Проанализируй этот торговый график для бинарных опционов. Ответь СТРОГО в формате JSON:

{
  "signal": "ВВЕРХ" или "ВНИЗ",
  "confidence": число от 0 до 100,
  "timeframe": "1 минута" или "5 минут",
  "expiration": "1-2 минуты" или "5-10 минут",
  "indicators": {
    "trend": "описание тренда и паттернов",
    "momentum": "показатели импульса (RSI, MACD, Stochastic)",
    "volume": "анализ объёмов торгов"
  },
  "analysis": "детальный технический анализ (2-3 предложения)",
  "entry_point": "рекомендация когда входить в сделку"
}

Анализируй:
- Свечные паттерны (Pin Bar, Молот, Поглощение, Дожи)
- Уровни поддержки/сопротивления
- Линии тренда и пробои
- Индикаторы технического анализа
- Momentum и силу движения

Будь точным и конкретным. Указывай реальные значения индикаторов если видны на графике."#;
